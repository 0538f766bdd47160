//! Utilities.

use std::iter::IntoIterator;

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (::std::mem::size_of::<usize>() * 8) - (value - 1).leading_zeros() as usize
    }
}

/// Returns the address width of a memory with `depth` words. Never narrower than one bit.
pub const fn addr_width(depth: usize) -> usize {
    let width = clog2(depth);
    if width == 0 {
        1
    } else {
        width
    }
}

/// Combines all elements into one String, separated by `sep`. Returns `None` if all elements are `None`.
pub fn join_options<I>(sep: &str, iterable: I) -> Option<String>
where I: IntoIterator<Item = Option<String>> {
    let iterable = iterable.into_iter().flatten().collect::<Vec<_>>();
    if iterable.is_empty() {
        None
    } else {
        Some(iterable.join(sep))
    }
}

/// Indents every line in the string.
pub fn indent(str: String, indent: usize) -> String {
    str.lines().map(|l| format!("{}{}", " ".repeat(indent), l)).collect::<Vec<_>>().join("\n")
}

/// Some or executing the given expression.
#[macro_export]
macro_rules! some_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Some(r) => r,
            None => $err,
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clog2_rounds_up() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(5), 3);
    }

    #[test]
    fn addr_width_is_at_least_one() {
        assert_eq!(addr_width(1), 1);
        assert_eq!(addr_width(4), 2);
        assert_eq!(addr_width(1000), 10);
    }

    #[test]
    fn join_options_skips_none() {
        assert_eq!(join_options("_", [Some("R0".to_string()), None, Some("en".to_string())]), Some("R0_en".into()));
        assert_eq!(join_options("_", [None, None]), None);
    }
}
