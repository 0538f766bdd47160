//! Four-state logic values.

use std::ops::{BitAnd, Deref};

/// Logic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicValue {
    /// Logic '0' or false condition
    False,
    /// Logic '1' or true condition
    True,
    /// Don't care or unknown value
    X,
    /// High impedance state
    Z,
}

impl ToString for LogicValue {
    fn to_string(&self) -> String {
        match self {
            LogicValue::False => "0",
            LogicValue::True => "1",
            LogicValue::X => "x",
            LogicValue::Z => "z",
        }
        .to_string()
    }
}

impl From<bool> for LogicValue {
    fn from(value: bool) -> Self {
        if value {
            LogicValue::True
        } else {
            LogicValue::False
        }
    }
}

impl LogicValue {
    /// Returns `true` if the value is `0` or `1`.
    pub fn is_known(self) -> bool { matches!(self, LogicValue::False | LogicValue::True) }

    fn and(self, rhs: Self) -> Self {
        match (self, rhs) {
            (LogicValue::False, _) | (_, LogicValue::False) => LogicValue::False,
            (LogicValue::True, LogicValue::True) => LogicValue::True,
            _ => LogicValue::X,
        }
    }
}

/// Logic values. Index 0 is the least significant bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicValues(Vec<LogicValue>);

impl ToString for LogicValues {
    /// Most significant bit first, as in a Verilog binary literal.
    fn to_string(&self) -> String { self.0.iter().rev().map(|b| b.to_string()).collect::<String>() }
}

impl Deref for LogicValues {
    type Target = [LogicValue];

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl FromIterator<LogicValue> for LogicValues {
    fn from_iter<T: IntoIterator<Item = LogicValue>>(iter: T) -> Self { Self(iter.into_iter().collect()) }
}

impl LogicValues {
    /// Creates new logic values.
    pub fn new(inner: Vec<LogicValue>) -> Self { Self(inner) }

    /// All-`x` value of the given width.
    pub fn x(width: usize) -> Self { Self(vec![LogicValue::X; width]) }

    /// Converts an integer into a `width`-bit value. Bits above `width` are dropped.
    pub fn from_u64(width: usize, value: u64) -> Self {
        (0..width).map(|i| LogicValue::from(i < u64::BITS as usize && (value >> i) & 1 == 1)).collect()
    }

    /// Returns the width.
    pub fn width(&self) -> usize { self.0.len() }

    /// Returns `true` if no bit is `x` or `z`.
    pub fn is_known(&self) -> bool { self.0.iter().all(|b| b.is_known()) }

    /// Returns `true` if every bit is `x`.
    pub fn is_x(&self) -> bool { self.0.iter().all(|b| *b == LogicValue::X) }

    /// Converts into an integer. Returns `None` if a bit is unknown or the value does not fit.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.iter().enumerate().try_fold(0u64, |acc, (i, b)| match b {
            LogicValue::False => Some(acc),
            LogicValue::True if i < u64::BITS as usize => Some(acc | (1 << i)),
            _ => None,
        })
    }

    /// Truth value in a Verilog `if`: nonzero and fully known.
    pub fn is_true(&self) -> bool { self.is_known() && self.0.iter().any(|b| *b == LogicValue::True) }

    /// Arithmetic equality. Any unknown bit yields a one-bit `x`.
    pub fn eq_arith(&self, rhs: &Self) -> Self {
        if !self.is_known() || !rhs.is_known() {
            return Self::x(1);
        }
        let width = self.width().max(rhs.width());
        let bit = |v: &Self, i: usize| v.0.get(i).copied().unwrap_or(LogicValue::False);
        Self(vec![LogicValue::from((0..width).all(|i| bit(self, i) == bit(rhs, i)))])
    }

    /// Merges both values bitwise, keeping bits on which they agree. Used for `x` selects.
    pub fn merge(&self, rhs: &Self) -> Self {
        assert_eq!(self.width(), rhs.width());
        self.0.iter().zip(rhs.0.iter()).map(|(l, r)| if l == r && l.is_known() { *l } else { LogicValue::X }).collect()
    }

    /// Truncates or zero-extends to `width` bits.
    #[must_use]
    pub fn resize(&self, width: usize) -> Self {
        (0..width).map(|i| self.0.get(i).copied().unwrap_or(LogicValue::False)).collect()
    }
}

impl BitAnd for &LogicValues {
    type Output = LogicValues;

    fn bitand(self, rhs: Self) -> LogicValues {
        assert_eq!(self.width(), rhs.width(), "bitwise operands have different widths");
        self.0.iter().zip(rhs.0.iter()).map(|(l, r)| l.and(*r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversion() {
        let v = LogicValues::from_u64(8, 0x5a);
        assert_eq!(v.to_string(), "01011010");
        assert_eq!(v.to_u64(), Some(0x5a));
        assert_eq!(LogicValues::from_u64(4, 0x1f).to_u64(), Some(0xf));
        assert_eq!(LogicValues::x(3).to_u64(), None);
    }

    #[test]
    fn and_with_zero_masks_x() {
        let zero = LogicValues::from_u64(1, 0);
        let one = LogicValues::from_u64(1, 1);
        let x = LogicValues::x(1);
        assert_eq!((&zero & &x).to_u64(), Some(0));
        assert!((&one & &x).is_x());
    }

    #[test]
    fn truth_value_needs_known_bits() {
        assert!(LogicValues::from_u64(2, 2).is_true());
        assert!(!LogicValues::from_u64(2, 0).is_true());
        assert!(!LogicValues::x(1).is_true());
    }

    #[test]
    fn merge_keeps_agreeing_bits() {
        let a = LogicValues::from_u64(4, 0b1100);
        let b = LogicValues::from_u64(4, 0b1010);
        assert_eq!(a.merge(&b).to_string(), "1xx0");
    }

    #[test]
    fn equality_is_unknown_with_x() {
        let a = LogicValues::from_u64(2, 1);
        assert_eq!(a.eq_arith(&LogicValues::from_u64(2, 1)).to_u64(), Some(1));
        assert_eq!(a.eq_arith(&LogicValues::from_u64(2, 0)).to_u64(), Some(0));
        assert!(a.eq_arith(&LogicValues::x(2)).is_x());
    }

    #[test]
    fn resize_extends_with_zeros() {
        assert_eq!(LogicValues::from_u64(2, 3).resize(4).to_u64(), Some(3));
        assert_eq!(LogicValues::from_u64(4, 0xd).resize(2).to_u64(), Some(1));
        assert_eq!(LogicValues::x(1).resize(3).to_string(), "00x");
    }
}
