//! Pipeline stager.

use crate::vir::{BlockBuilder, Context, ModuleBuilder, Signal};

/// Delays `signal` by `count` rising edges of `clock`.
///
/// Every stage is a register named `d{i}` within `ctx`, captured by its own `always @(posedge clock)` block.
/// Pipeline registers have no reset and no enable. `count == 0` returns `signal` itself.
pub fn stage(builder: &mut ModuleBuilder, ctx: &Context, signal: Signal, clock: &Signal, count: usize) -> Signal {
    if count > 0 {
        log::debug!("staging `{}` by {} cycle(s)", ctx.get_prefix().unwrap_or_default(), count);
    }

    (0..count).fold(signal, |current, i| {
        let reg = builder.add_reg(ctx, &format!("d{}", i), current.width());
        let mut block = BlockBuilder::new();
        block.nonblocking(reg.expr().clone(), current.into_expr());
        builder.always_ff(clock, block.finish());
        reg
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vir::{Event, ModuleItem, PortDeclaration, Statement};

    fn builder() -> ModuleBuilder {
        ModuleBuilder::new("m".to_string(), vec![
            PortDeclaration::input(1, "clk".to_string()),
            PortDeclaration::input(4, "a".to_string()),
        ])
    }

    #[test]
    fn zero_stages_is_identity() {
        let mut builder = builder();
        let a = Signal::ident("a", 4);
        let staged = stage(&mut builder, &Context::new().scoped("a"), a.clone(), &Signal::ident("clk", 1), 0);
        assert_eq!(staged, a);
        assert!(builder.finish().module_items.is_empty());
    }

    #[test]
    fn stages_form_a_chain() {
        let mut builder = builder();
        let clk = Signal::ident("clk", 1);
        let ctx = Context::new().scoped("R0").scoped("addr");
        let staged = stage(&mut builder, &ctx, Signal::ident("a", 4), &clk, 2);
        assert_eq!(staged, Signal::ident("R0_addr_d1", 4));

        let module = builder.finish();
        assert_eq!(module.declarations().len(), 2);
        let blocks = module.always_constructs();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], (&Event::PosEdge(clk.into_expr()), &[Statement::NonblockingAssignment(
            "R0_addr_d1".to_string().into(),
            "R0_addr_d0".to_string().into()
        )][..]));
        assert!(module.module_items.iter().all(|item| !matches!(item, ModuleItem::ContinuousAssigns(_))));
    }
}
