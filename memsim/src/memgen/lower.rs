//! Port lowerers and the module assembler.

use super::*;
use crate::vir::{
    self, BinaryOp, BlockBuilder, BuildError, Context, Expression, ModuleBuilder, PortDeclaration, Signal, Storage,
};

/// Lowering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemSimOptions {
    /// Descriptor tag of the generator schemas whose modules are lowered.
    pub descriptor_tag: String,

    /// Name of the storage array in lowered modules.
    pub storage_name: String,
}

impl Default for MemSimOptions {
    fn default() -> Self { Self { descriptor_tag: MEMORY_DESCRIPTOR.to_string(), storage_name: "Memory".to_string() } }
}

/// Lowers a read port: `en ? storage[addr] : x`, with enable and address delayed by `stages` cycles.
pub fn lower_read_port(
    builder: &mut ModuleBuilder, ctx: &Context, storage: &Storage, port: ReadPort, stages: usize,
) -> Signal {
    let ReadPort { clock, enable, address } = port;

    let enable = stage(builder, &ctx.scoped("en"), enable, &clock, stages);
    let address = stage(builder, &ctx.scoped("addr"), address, &clock, stages);

    let data = storage.read(&address);
    let width = data.width();
    Signal::new(Expression::conditional(enable.into_expr(), data.into_expr(), Expression::x(width)), width)
}

/// Lowers a write port: on the rising edge, `storage[addr] <= data` if `en & mask`.
pub fn lower_write_port(builder: &mut ModuleBuilder, ctx: &Context, storage: &Storage, port: WritePort, stages: usize) {
    let WritePort { clock, enable, address, mask, data } = port;

    let enable = stage(builder, &ctx.scoped("en"), enable, &clock, stages);
    let address = stage(builder, &ctx.scoped("addr"), address, &clock, stages);
    let mask = stage(builder, &ctx.scoped("mask"), mask, &clock, stages);
    let data = stage(builder, &ctx.scoped("data"), data, &clock, stages);

    let mut block = BlockBuilder::new();
    block
        .begin_if(Expression::binary(BinaryOp::And, enable.into_expr(), mask.into_expr()))
        .nonblocking(storage.slot(&address), data.into_expr())
        .end_if();
    builder.always_ff(&clock, block.finish());
}

/// Lowers a read-write port.
///
/// A write (`en & (mask & mode)`) takes priority: the read result stays `x` and the word is written on the
/// rising edge. Otherwise a read (`en & (mode == 0)`) returns the addressed word combinationally.
pub fn lower_read_write_port(
    builder: &mut ModuleBuilder, ctx: &Context, storage: &Storage, port: ReadWritePort, stages: usize,
) -> Signal {
    let ReadWritePort { clock, enable, address, mode, mask, data } = port;

    let enable = stage(builder, &ctx.scoped("en"), enable, &clock, stages);
    let address = stage(builder, &ctx.scoped("addr"), address, &clock, stages);
    let mode = stage(builder, &ctx.scoped("wmode"), mode, &clock, stages);
    let mask = stage(builder, &ctx.scoped("wmask"), mask, &clock, stages);
    let data = stage(builder, &ctx.scoped("wdata"), data, &clock, stages);

    let write_cond = Expression::binary(
        BinaryOp::And,
        enable.expr().clone(),
        Expression::binary(BinaryOp::And, mask.into_expr(), mode.expr().clone()),
    );
    let write_cond = builder.add_net(ctx, "wcond", write_cond, 1);

    let read_cond = Expression::binary(
        BinaryOp::And,
        enable.into_expr(),
        Expression::binary(BinaryOp::EqArithmetic, mode.into_expr(), Expression::constant(1, 0)),
    );
    let read_cond = builder.add_net(ctx, "rcond", read_cond, 1);

    let width = storage.width();
    let hold = builder.add_reg(ctx, "rdata_hold", width);

    let mut read = BlockBuilder::new();
    read.blocking(hold.expr().clone(), Expression::x(width))
        .begin_if(write_cond.expr().clone())
        .begin_else()
        .begin_if(read_cond.into_expr())
        .blocking(hold.expr().clone(), storage.slot(&address))
        .end_if()
        .end_if();
    builder.always_comb(read.finish());

    let mut write = BlockBuilder::new();
    write.begin_if(write_cond.into_expr()).nonblocking(storage.slot(&address), data.into_expr()).end_if();
    builder.always_ff(&clock, write.finish());

    hold
}

/// Lowers a memory into a behavioral module with the given name and port signature.
///
/// Nothing is built unless the descriptor is valid and the port signature matches it.
pub fn lower_memory(
    ctx: &Context, name: &str, port_decls: Vec<PortDeclaration>, descriptor: &MemoryDescriptor,
    options: &MemSimOptions,
) -> Result<vir::Module, LowerError> {
    descriptor.validate()?;

    let inputs = port_decls
        .iter()
        .filter(|port| port.is_input())
        .map(|port| Signal::ident(port.name(), port.width()))
        .collect::<Vec<_>>();
    let groups = group_ports(descriptor, &inputs)?;

    let outputs = port_decls.iter().filter(|port| !port.is_input()).collect::<Vec<_>>();
    if outputs.len() != descriptor.num_outputs() {
        return Err(LowerError::OutputCountMismatch { expected: descriptor.num_outputs(), actual: outputs.len() });
    }
    if let Some(port) = outputs.iter().find(|port| port.width() != descriptor.data_width()) {
        return Err(BuildError::OutputWidthMismatch {
            port: port.name().to_string(),
            expected: port.width(),
            actual: descriptor.data_width(),
        }
        .into());
    }

    let mut builder = ModuleBuilder::new(name.to_string(), port_decls);
    let storage = builder.add_storage(ctx, &options.storage_name, descriptor.data_width(), descriptor.depth());

    // Only `None` when there are no ports of that kind.
    let write_stages = descriptor.write_stages().unwrap_or_default();
    let read_write_stages = descriptor.read_write_stages().unwrap_or_default();

    let mut values = Vec::with_capacity(descriptor.num_outputs());

    for (index, port) in groups.read.into_iter().enumerate() {
        let port_name = PortKind::Read.port_name(index);
        log::debug!("{}: lowering read port {}", name, port_name);
        builder.enter_section(format!("Read port {}", port_name));
        values.push(lower_read_port(&mut builder, &ctx.scoped(&port_name), &storage, port, descriptor.read_stages()));
        builder.leave_section();
    }

    for (index, port) in groups.read_write.into_iter().enumerate() {
        let port_name = PortKind::ReadWrite.port_name(index);
        log::debug!("{}: lowering read-write port {}", name, port_name);
        builder.enter_section(format!("Read-write port {}", port_name));
        let port_ctx = ctx.scoped(&port_name);
        values.push(lower_read_write_port(&mut builder, &port_ctx, &storage, port, read_write_stages));
        builder.leave_section();
    }

    for (index, port) in groups.write.into_iter().enumerate() {
        let port_name = PortKind::Write.port_name(index);
        log::debug!("{}: lowering write port {}", name, port_name);
        builder.enter_section(format!("Write port {}", port_name));
        lower_write_port(&mut builder, &ctx.scoped(&port_name), &storage, port, write_stages);
        builder.leave_section();
    }

    builder.set_outputs(values)?;

    log::info!(
        "lowered memory `{}`: {}x{}, {}R/{}RW/{}W, latency {}/{}",
        name,
        descriptor.depth(),
        descriptor.data_width(),
        descriptor.num_read_ports(),
        descriptor.num_read_write_ports(),
        descriptor.num_write_ports(),
        descriptor.read_latency(),
        descriptor.write_latency()
    );

    Ok(builder.finish())
}
