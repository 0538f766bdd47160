//! Port kinds and grouping of a memory module's input signals into per-port tuples.

use arrayvec::ArrayVec;
use itertools::izip;

use super::*;
use crate::vir::Signal;

/// Largest number of input signals of a single port.
pub const MAX_PORT_FIELDS: usize = 6;

/// Role of an input signal within its port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Port clock.
    Clock,
    /// Port enable.
    Enable,
    /// Word address.
    Address,
    /// Read-write discriminator: `0` reads, nonzero writes.
    WriteMode,
    /// Write mask.
    WriteMask,
    /// Write data.
    WriteData,
}

/// Input signal of a port: its role and its name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortField {
    kind: FieldKind,
    name: &'static str,
}

impl PortField {
    const fn new(kind: FieldKind, name: &'static str) -> Self { Self { kind, name } }

    /// Role of the signal.
    pub fn kind(&self) -> FieldKind { self.kind }

    /// Name suffix of the signal.
    pub fn name(&self) -> &'static str { self.name }

    /// Declared width of the signal for the given memory.
    pub fn width(&self, descriptor: &MemoryDescriptor) -> usize {
        match self.kind {
            FieldKind::Address => descriptor.addr_width(),
            FieldKind::WriteData => descriptor.data_width(),
            FieldKind::Clock | FieldKind::Enable | FieldKind::WriteMode | FieldKind::WriteMask => 1,
        }
    }
}

const READ_FIELDS: [PortField; 3] = [
    PortField::new(FieldKind::Clock, "clk"),
    PortField::new(FieldKind::Enable, "en"),
    PortField::new(FieldKind::Address, "addr"),
];

const WRITE_FIELDS: [PortField; 5] = [
    PortField::new(FieldKind::Clock, "clk"),
    PortField::new(FieldKind::Enable, "en"),
    PortField::new(FieldKind::Address, "addr"),
    PortField::new(FieldKind::WriteMask, "mask"),
    PortField::new(FieldKind::WriteData, "data"),
];

const READ_WRITE_FIELDS: [PortField; MAX_PORT_FIELDS] = [
    PortField::new(FieldKind::Clock, "clk"),
    PortField::new(FieldKind::Enable, "en"),
    PortField::new(FieldKind::Address, "addr"),
    PortField::new(FieldKind::WriteMode, "wmode"),
    PortField::new(FieldKind::WriteMask, "wmask"),
    PortField::new(FieldKind::WriteData, "wdata"),
];

/// Port kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Read-only port.
    Read,
    /// Write-only port.
    Write,
    /// Combined read-write port.
    ReadWrite,
}

impl PortKind {
    /// Input signals of the port, in consumption order.
    pub fn fields(self) -> &'static [PortField] {
        match self {
            PortKind::Read => &READ_FIELDS,
            PortKind::Write => &WRITE_FIELDS,
            PortKind::ReadWrite => &READ_WRITE_FIELDS,
        }
    }

    /// Number of input signals of the port.
    pub fn arity(self) -> usize { self.fields().len() }

    /// Name of the `index`-th port of this kind, e.g. `RW0`.
    pub fn port_name(self, index: usize) -> String {
        let prefix = match self {
            PortKind::Read => "R",
            PortKind::Write => "W",
            PortKind::ReadWrite => "RW",
        };
        format!("{}{}", prefix, index)
    }

    /// Name suffix of the port's output, if it has one.
    pub fn output_name(self) -> Option<&'static str> {
        match self {
            PortKind::Read => Some("data"),
            PortKind::ReadWrite => Some("rdata"),
            PortKind::Write => None,
        }
    }
}

/// Read port signals.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPort {
    pub clock: Signal,
    pub enable: Signal,
    pub address: Signal,
}

/// Write port signals.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePort {
    pub clock: Signal,
    pub enable: Signal,
    pub address: Signal,
    pub mask: Signal,
    pub data: Signal,
}

/// Read-write port signals.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadWritePort {
    pub clock: Signal,
    pub enable: Signal,
    pub address: Signal,
    pub mode: Signal,
    pub mask: Signal,
    pub data: Signal,
}

/// Ports of a memory, each list in port-index order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PortGroups {
    /// Read ports.
    pub read: Vec<ReadPort>,

    /// Read-write ports.
    pub read_write: Vec<ReadWritePort>,

    /// Write ports.
    pub write: Vec<WritePort>,
}

/// Takes the next port tuple off `signals`, checking the declared widths.
fn take_port<'a, I>(
    signals: &mut I, kind: PortKind, index: usize, descriptor: &MemoryDescriptor,
) -> Result<ArrayVec<Signal, MAX_PORT_FIELDS>, LowerError>
where I: Iterator<Item = &'a Signal> {
    let tuple = signals.take(kind.arity()).cloned().collect::<ArrayVec<_, MAX_PORT_FIELDS>>();
    assert_eq!(tuple.len(), kind.arity(), "signal count is checked before grouping");

    for (field, signal) in izip!(kind.fields(), &tuple) {
        // The address is not checked: any width can index the storage, out-of-range reads are undefined.
        if field.kind() == FieldKind::Address {
            continue;
        }
        let expected = field.width(descriptor);
        if signal.width() != expected {
            return Err(LowerError::PortWidthMismatch {
                port: kind.port_name(index),
                field: field.name().to_string(),
                expected,
                actual: signal.width(),
            });
        }
    }

    Ok(tuple)
}

/// Partitions the ordered input signals into per-port tuples.
///
/// Signals are consumed strictly left to right: all read ports, then all read-write ports, then all write ports.
pub fn group_ports(descriptor: &MemoryDescriptor, signals: &[Signal]) -> Result<PortGroups, LowerError> {
    let expected = descriptor.num_inputs();
    if signals.len() != expected {
        return Err(LowerError::SignalCountMismatch { expected, actual: signals.len() });
    }

    let mut signals = signals.iter();
    let mut groups = PortGroups::default();

    for index in 0..descriptor.num_read_ports() {
        let mut fields = take_port(&mut signals, PortKind::Read, index, descriptor)?.into_iter();
        let mut next = || fields.next().expect("tuple has the port's arity");
        groups.read.push(ReadPort { clock: next(), enable: next(), address: next() });
    }

    for index in 0..descriptor.num_read_write_ports() {
        let mut fields = take_port(&mut signals, PortKind::ReadWrite, index, descriptor)?.into_iter();
        let mut next = || fields.next().expect("tuple has the port's arity");
        groups.read_write.push(ReadWritePort {
            clock: next(),
            enable: next(),
            address: next(),
            mode: next(),
            mask: next(),
            data: next(),
        });
    }

    for index in 0..descriptor.num_write_ports() {
        let mut fields = take_port(&mut signals, PortKind::Write, index, descriptor)?.into_iter();
        let mut next = || fields.next().expect("tuple has the port's arity");
        groups.write.push(WritePort { clock: next(), enable: next(), address: next(), mask: next(), data: next() });
    }

    debug_assert!(signals.next().is_none());
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(descriptor: &MemoryDescriptor) -> Vec<Signal> {
        descriptor
            .port_decls()
            .iter()
            .filter(|port| port.is_input())
            .map(|port| Signal::ident(port.name(), port.width()))
            .collect()
    }

    #[test]
    fn groups_in_consumption_order() {
        let descriptor = MemoryDescriptor::new(8, 4).with_ports(2, 1, 1).with_latency(1, 1);
        let groups = group_ports(&descriptor, &signals(&descriptor)).unwrap();

        assert_eq!(groups.read.len(), 2);
        assert_eq!(groups.read_write.len(), 1);
        assert_eq!(groups.write.len(), 1);
        assert_eq!(groups.read[1].address.expr().as_ident(), Some("R1_addr"));
        assert_eq!(groups.read_write[0].mode.expr().as_ident(), Some("RW0_wmode"));
        assert_eq!(groups.read_write[0].data.expr().as_ident(), Some("RW0_wdata"));
        assert_eq!(groups.write[0].mask.expr().as_ident(), Some("W0_mask"));
        assert_eq!(groups.write[0].data.width(), 8);
    }

    #[test]
    fn count_mismatch_is_reported_both_ways() {
        let descriptor = MemoryDescriptor::new(8, 4).with_ports(1, 1, 0).with_latency(1, 1);
        let mut inputs = signals(&descriptor);
        inputs.pop();
        assert_eq!(group_ports(&descriptor, &inputs), Err(LowerError::SignalCountMismatch { expected: 8, actual: 7 }));
        inputs.push(Signal::ident("W0_data", 8));
        inputs.push(Signal::ident("extra", 1));
        assert_eq!(group_ports(&descriptor, &inputs), Err(LowerError::SignalCountMismatch { expected: 8, actual: 9 }));
    }

    #[test]
    fn widths_are_checked() {
        let descriptor = MemoryDescriptor::new(8, 4).with_ports(0, 1, 0).with_latency(1, 1);
        let mut inputs = signals(&descriptor);
        inputs[4] = Signal::ident("W0_data", 7);
        assert_eq!(
            group_ports(&descriptor, &inputs),
            Err(LowerError::PortWidthMismatch {
                port: "W0".to_string(),
                field: "data".to_string(),
                expected: 8,
                actual: 7
            })
        );
    }

    #[test]
    fn no_ports() {
        let descriptor = MemoryDescriptor::new(8, 4);
        assert_eq!(group_ports(&descriptor, &[]), Ok(PortGroups::default()));
    }
}
