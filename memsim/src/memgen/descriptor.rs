//! Memory descriptor.

use linked_hash_map::LinkedHashMap;
use static_assertions::assert_impl_all;

use super::*;
use crate::hw::{Attribute, GeneratedModule, GeneratorSchema};
use crate::vir::PortDeclaration;

/// Descriptor tag of generators that describe memories.
pub const MEMORY_DESCRIPTOR: &str = "FIRRTL_Memory";

/// Largest accepted read or write latency.
pub const MAX_LATENCY: usize = 1024;

/// Attribute names a memory generator's modules carry.
pub mod attr {
    /// Number of read ports.
    pub const NUM_READ_PORTS: &str = "numReadPorts";
    /// Number of write ports.
    pub const NUM_WRITE_PORTS: &str = "numWritePorts";
    /// Number of read-write ports.
    pub const NUM_READ_WRITE_PORTS: &str = "numReadWritePorts";
    /// Word width.
    pub const WIDTH: &str = "width";
    /// Number of words.
    pub const DEPTH: &str = "depth";
    /// Read latency.
    pub const READ_LATENCY: &str = "readLatency";
    /// Write latency.
    pub const WRITE_LATENCY: &str = "writeLatency";
    /// Read-under-write policy.
    pub const READ_UNDER_WRITE: &str = "readUnderWrite";

    /// All of the above.
    pub const ALL: [&str; 8] = [
        NUM_READ_PORTS,
        NUM_WRITE_PORTS,
        NUM_READ_WRITE_PORTS,
        WIDTH,
        DEPTH,
        READ_LATENCY,
        WRITE_LATENCY,
        READ_UNDER_WRITE,
    ];
}

/// Read-under-write policy.
///
/// Carried through lowering but never interpreted: read-write ports always give writes priority.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadUnderWrite {
    /// The read returns an undefined value.
    #[default]
    Undefined,

    /// The read returns the old value.
    Old,

    /// The read returns the new value.
    New,
}

impl TryFrom<i64> for ReadUnderWrite {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReadUnderWrite::Undefined),
            1 => Ok(ReadUnderWrite::Old),
            2 => Ok(ReadUnderWrite::New),
            _ => Err(format!("unknown read-under-write policy {}", value)),
        }
    }
}

impl From<ReadUnderWrite> for i64 {
    fn from(value: ReadUnderWrite) -> Self {
        match value {
            ReadUnderWrite::Undefined => 0,
            ReadUnderWrite::Old => 1,
            ReadUnderWrite::New => 2,
        }
    }
}

/// Memory descriptor: port counts, geometry and latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryDescriptor {
    num_read_ports: usize,
    num_write_ports: usize,
    num_read_write_ports: usize,
    data_width: usize,
    depth: usize,
    read_latency: usize,
    write_latency: usize,
    read_under_write: ReadUnderWrite,
}

assert_impl_all!(MemoryDescriptor: Send, Sync, Copy);

impl MemoryDescriptor {
    /// Creates a descriptor without ports, with combinational reads and single-cycle writes.
    pub fn new(data_width: usize, depth: usize) -> Self {
        Self {
            num_read_ports: 0,
            num_write_ports: 0,
            num_read_write_ports: 0,
            data_width,
            depth,
            read_latency: 0,
            write_latency: 1,
            read_under_write: ReadUnderWrite::Undefined,
        }
    }

    /// Sets the port counts.
    #[must_use]
    pub fn with_ports(self, read: usize, write: usize, read_write: usize) -> Self {
        Self { num_read_ports: read, num_write_ports: write, num_read_write_ports: read_write, ..self }
    }

    /// Sets the latencies.
    #[must_use]
    pub fn with_latency(self, read: usize, write: usize) -> Self {
        Self { read_latency: read, write_latency: write, ..self }
    }

    /// Sets the read-under-write policy.
    #[must_use]
    pub fn with_read_under_write(self, read_under_write: ReadUnderWrite) -> Self { Self { read_under_write, ..self } }

    /// Number of read ports.
    pub fn num_read_ports(&self) -> usize { self.num_read_ports }

    /// Number of write ports.
    pub fn num_write_ports(&self) -> usize { self.num_write_ports }

    /// Number of read-write ports.
    pub fn num_read_write_ports(&self) -> usize { self.num_read_write_ports }

    /// Word width.
    pub fn data_width(&self) -> usize { self.data_width }

    /// Number of words.
    pub fn depth(&self) -> usize { self.depth }

    /// Read latency.
    pub fn read_latency(&self) -> usize { self.read_latency }

    /// Write latency.
    pub fn write_latency(&self) -> usize { self.write_latency }

    /// Read-under-write policy.
    pub fn read_under_write(&self) -> ReadUnderWrite { self.read_under_write }

    /// Address width of every port.
    pub fn addr_width(&self) -> usize { crate::utils::addr_width(self.depth) }

    /// Pipeline stages in front of a read port.
    pub fn read_stages(&self) -> usize { self.read_latency }

    /// Pipeline stages in front of a write port, or `None` if the write latency is 0.
    pub fn write_stages(&self) -> Option<usize> { self.write_latency.checked_sub(1) }

    /// Pipeline stages in front of a read-write port, or `None` if both latencies are 0.
    pub fn read_write_stages(&self) -> Option<usize> { self.read_latency.max(self.write_latency).checked_sub(1) }

    /// Number of input signals of a memory module with this descriptor.
    pub fn num_inputs(&self) -> usize {
        self.num_read_ports * PortKind::Read.arity()
            + self.num_read_write_ports * PortKind::ReadWrite.arity()
            + self.num_write_ports * PortKind::Write.arity()
    }

    /// Number of output signals of a memory module with this descriptor.
    pub fn num_outputs(&self) -> usize { self.num_read_ports + self.num_read_write_ports }

    /// Checks that the descriptor can be lowered.
    pub fn validate(&self) -> Result<(), LowerError> {
        if self.data_width == 0 {
            return Err(LowerError::InvalidDescriptor("data width must be positive".to_string()));
        }
        if self.depth == 0 {
            return Err(LowerError::InvalidDescriptor("depth must be positive".to_string()));
        }
        for (name, latency) in [("read", self.read_latency), ("write", self.write_latency)] {
            if latency > MAX_LATENCY {
                return Err(LowerError::InvalidDescriptor(format!(
                    "{} latency {} exceeds the maximum of {}",
                    name, latency, MAX_LATENCY
                )));
            }
        }
        if self.num_write_ports > 0 && self.write_latency == 0 {
            return Err(LowerError::InvalidDescriptor("write ports require a write latency of at least 1".to_string()));
        }
        if self.num_read_write_ports > 0 && self.read_latency.max(self.write_latency) == 0 {
            return Err(LowerError::InvalidDescriptor(
                "read-write ports require a read or write latency of at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads and validates the descriptor carried by a generated module's attributes.
    pub fn from_attributes(module: &str, attrs: &LinkedHashMap<String, Attribute>) -> Result<Self, LowerError> {
        let get = |attribute: &str| -> Result<i64, LowerError> {
            match attrs.get(attribute) {
                Some(Attribute::Int(value)) => Ok(*value),
                Some(Attribute::Str(_)) => Err(LowerError::InvalidAttribute {
                    module: module.to_string(),
                    attribute: attribute.to_string(),
                    reason: "expected an integer".to_string(),
                }),
                None => {
                    Err(LowerError::MissingAttribute { module: module.to_string(), attribute: attribute.to_string() })
                }
            }
        };
        let get_usize = |attribute: &str| -> Result<usize, LowerError> {
            let value = get(attribute)?;
            usize::try_from(value).map_err(|_| LowerError::InvalidAttribute {
                module: module.to_string(),
                attribute: attribute.to_string(),
                reason: format!("expected a non-negative integer, found {}", value),
            })
        };

        let read_under_write = ReadUnderWrite::try_from(get(attr::READ_UNDER_WRITE)?).map_err(|reason| {
            LowerError::InvalidAttribute {
                module: module.to_string(),
                attribute: attr::READ_UNDER_WRITE.to_string(),
                reason,
            }
        })?;

        let descriptor = Self {
            num_read_ports: get_usize(attr::NUM_READ_PORTS)?,
            num_write_ports: get_usize(attr::NUM_WRITE_PORTS)?,
            num_read_write_ports: get_usize(attr::NUM_READ_WRITE_PORTS)?,
            data_width: get_usize(attr::WIDTH)?,
            depth: get_usize(attr::DEPTH)?,
            read_latency: get_usize(attr::READ_LATENCY)?,
            write_latency: get_usize(attr::WRITE_LATENCY)?,
            read_under_write,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Generator attributes describing this descriptor.
    pub fn to_attributes(&self) -> LinkedHashMap<String, Attribute> {
        let values = [
            self.num_read_ports,
            self.num_write_ports,
            self.num_read_write_ports,
            self.data_width,
            self.depth,
            self.read_latency,
            self.write_latency,
        ];
        let mut attrs = attr::ALL
            .iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), Attribute::Int(value as i64)))
            .collect::<LinkedHashMap<_, _>>();
        attrs.insert(attr::READ_UNDER_WRITE.to_string(), Attribute::Int(self.read_under_write.into()));
        attrs
    }

    /// Port signature of a memory module with this descriptor.
    ///
    /// Inputs come first, grouped per port in consumption order (read, read-write, write); then one
    /// output per read and read-write port.
    pub fn port_decls(&self) -> Vec<PortDeclaration> {
        let port_kinds = [
            (PortKind::Read, self.num_read_ports),
            (PortKind::ReadWrite, self.num_read_write_ports),
            (PortKind::Write, self.num_write_ports),
        ];

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for (kind, count) in port_kinds {
            for index in 0..count {
                let prefix = kind.port_name(index);
                for field in kind.fields() {
                    inputs.push(PortDeclaration::input(field.width(self), format!("{}_{}", prefix, field.name())));
                }
                if let Some(output) = kind.output_name() {
                    outputs.push(PortDeclaration::output(self.data_width, format!("{}_{}", prefix, output)));
                }
            }
        }
        inputs.extend(outputs);
        inputs
    }

    /// Declarative module of this memory, referring to the generator `generator`.
    pub fn generated_module(&self, name: &str, generator: &str) -> GeneratedModule {
        let mut module = GeneratedModule::new(name, generator, self.port_decls());
        module.attrs = self.to_attributes();
        module
    }
}

/// Schema of a memory generator.
pub fn memory_schema(name: &str) -> GeneratorSchema { GeneratorSchema::new(name, MEMORY_DESCRIPTOR, &attr::ALL) }

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> MemoryDescriptor { MemoryDescriptor::new(8, 4).with_ports(1, 1, 0).with_latency(1, 1) }

    #[test]
    fn attributes_round_trip() {
        let descriptor = scenario().with_read_under_write(ReadUnderWrite::New);
        let attrs = descriptor.to_attributes();
        assert_eq!(attrs.get(attr::WIDTH), Some(&Attribute::Int(8)));
        assert_eq!(MemoryDescriptor::from_attributes("m", &attrs), Ok(descriptor));
    }

    #[test]
    fn missing_and_negative_attributes() {
        let mut attrs = scenario().to_attributes();
        attrs.insert(attr::DEPTH.to_string(), Attribute::Int(-4));
        assert!(matches!(
            MemoryDescriptor::from_attributes("m", &attrs),
            Err(LowerError::InvalidAttribute { attribute, .. }) if attribute == attr::DEPTH
        ));

        attrs.remove(attr::DEPTH);
        assert_eq!(
            MemoryDescriptor::from_attributes("m", &attrs),
            Err(LowerError::MissingAttribute { module: "m".to_string(), attribute: attr::DEPTH.to_string() })
        );

        let mut attrs = scenario().to_attributes();
        attrs.insert(attr::READ_UNDER_WRITE.to_string(), Attribute::Int(7));
        assert!(matches!(MemoryDescriptor::from_attributes("m", &attrs), Err(LowerError::InvalidAttribute { .. })));
    }

    #[test]
    fn zero_write_latency_is_rejected() {
        assert!(matches!(
            MemoryDescriptor::new(8, 4).with_ports(0, 1, 0).with_latency(1, 0).validate(),
            Err(LowerError::InvalidDescriptor(_))
        ));
        // Without write ports the write latency is irrelevant.
        assert_eq!(MemoryDescriptor::new(8, 4).with_ports(1, 0, 0).with_latency(1, 0).validate(), Ok(()));
        assert!(MemoryDescriptor::new(8, 4).with_ports(0, 0, 1).with_latency(0, 0).validate().is_err());
        assert_eq!(MemoryDescriptor::new(8, 4).with_ports(0, 0, 1).with_latency(1, 0).validate(), Ok(()));
    }

    #[test]
    fn geometry_and_latency_bounds() {
        assert!(MemoryDescriptor::new(0, 4).validate().is_err());
        assert!(MemoryDescriptor::new(8, 0).validate().is_err());
        assert!(MemoryDescriptor::new(8, 4).with_latency(MAX_LATENCY + 1, 1).validate().is_err());
        assert_eq!(MemoryDescriptor::new(8, 4).with_latency(MAX_LATENCY, MAX_LATENCY).validate(), Ok(()));
    }

    #[test]
    fn stage_counts() {
        let descriptor = MemoryDescriptor::new(8, 4).with_latency(2, 1);
        assert_eq!(descriptor.read_stages(), 2);
        assert_eq!(descriptor.write_stages(), Some(0));
        assert_eq!(descriptor.read_write_stages(), Some(1));
    }

    #[test]
    fn stage_counts_without_latency() {
        // Valid: the zero write latency is irrelevant without write or read-write ports.
        let descriptor = MemoryDescriptor::new(8, 4).with_ports(1, 0, 0).with_latency(1, 0);
        assert_eq!(descriptor.validate(), Ok(()));
        assert_eq!(descriptor.write_stages(), None);
        assert_eq!(descriptor.read_write_stages(), Some(0));

        let descriptor = MemoryDescriptor::new(8, 4).with_ports(1, 0, 0).with_latency(0, 0);
        assert_eq!(descriptor.validate(), Ok(()));
        assert_eq!(descriptor.read_write_stages(), None);
    }

    #[test]
    fn port_signature_order() {
        let descriptor = MemoryDescriptor::new(8, 4).with_ports(1, 1, 1).with_latency(1, 1);
        let names = descriptor.port_decls().iter().map(|port| port.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec![
            "R0_clk", "R0_en", "R0_addr", "RW0_clk", "RW0_en", "RW0_addr", "RW0_wmode", "RW0_wmask", "RW0_wdata",
            "W0_clk", "W0_en", "W0_addr", "W0_mask", "W0_data", "R0_data", "RW0_rdata",
        ]);
        assert_eq!(descriptor.num_inputs(), 14);
        assert_eq!(descriptor.num_outputs(), 2);
        assert_eq!(descriptor.port_decls()[2].width(), 2);
    }
}
