//! Example memories.

use memsim::memgen::ReadUnderWrite;
use memsim::MemoryDescriptor;

/// Single-cycle scratchpad: one read port, one write port.
pub fn scratchpad() -> MemoryDescriptor { MemoryDescriptor::new(8, 4).with_ports(1, 1, 0).with_latency(1, 1) }

/// Register file with two combinational read ports.
pub fn regfile() -> MemoryDescriptor { MemoryDescriptor::new(32, 32).with_ports(2, 1, 0).with_latency(0, 1) }

/// Single-port SRAM macro with a registered read.
pub fn sram() -> MemoryDescriptor {
    MemoryDescriptor::new(64, 1024).with_ports(0, 0, 1).with_latency(2, 1).with_read_under_write(ReadUnderWrite::Old)
}

/// Deeply pipelined dual-port buffer.
pub fn pipelined_buffer() -> MemoryDescriptor {
    MemoryDescriptor::new(16, 256).with_ports(1, 1, 1).with_latency(3, 2)
}

/// Storage without ports.
pub fn blackhole() -> MemoryDescriptor { MemoryDescriptor::new(8, 1) }
