use memsim::memgen::*;
use memsim::vir::{Context, Declaration, Event, Module, PortDeclaration};

fn lower(descriptor: &MemoryDescriptor) -> Result<Module, LowerError> {
    let _ = env_logger::try_init();
    lower_memory(&Context::new(), "mem", descriptor.port_decls(), descriptor, &MemSimOptions::default())
}

fn count_regs(module: &Module) -> usize {
    module.declarations().into_iter().filter(|decl| matches!(decl, Declaration::Reg(shape, _) if shape.dim() == 1)).count()
}

#[test]
fn output_arity_matches_port_counts() {
    for (read, write, read_write) in itertools::iproduct!(0..3, 0..3, 0..3) {
        let descriptor = MemoryDescriptor::new(8, 4).with_ports(read, write, read_write).with_latency(1, 1);
        let module = lower(&descriptor).unwrap();

        assert_eq!(module.outputs().count(), read + read_write);
        assert_eq!(module.inputs().count(), read * 3 + read_write * 6 + write * 5);

        let storage = module.declarations().into_iter().filter(|decl| decl.shape().dim() == 2).collect::<Vec<_>>();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage[0].name(), "Memory");
    }
}

#[test]
fn stage_counts_per_port_class() {
    // Read ports: `rl` stages of enable and address.
    let module = lower(&MemoryDescriptor::new(8, 4).with_ports(1, 0, 0).with_latency(3, 1)).unwrap();
    assert_eq!(count_regs(&module), 6);

    // Write ports: `wl - 1` stages of enable, address, mask and data.
    let module = lower(&MemoryDescriptor::new(8, 4).with_ports(0, 1, 0).with_latency(0, 3)).unwrap();
    assert_eq!(count_regs(&module), 8);

    // Read-write ports: `max(rl, wl) - 1` stages of five signals, plus the read holder.
    let module = lower(&MemoryDescriptor::new(8, 4).with_ports(0, 0, 1).with_latency(2, 1)).unwrap();
    assert_eq!(count_regs(&module), 6);
    assert!(module.declarations().iter().any(|decl| decl.name() == "RW0_rdata_hold"));
}

#[test]
fn ports_are_lowered_in_fixed_order() {
    let module = lower(&MemoryDescriptor::new(8, 4).with_ports(1, 1, 1).with_latency(1, 2)).unwrap();
    let text = module.to_string();

    let read = text.find("/*\n    Read port R0").unwrap();
    let read_write = text.find("/*\n    Read-write port RW0").unwrap();
    let write = text.find("/*\n    Write port W0").unwrap();
    assert!(read < read_write && read_write < write);

    let outputs = module.outputs().map(PortDeclaration::name).collect::<Vec<_>>();
    assert_eq!(outputs, vec!["R0_data", "RW0_rdata"]);
}

#[test]
fn read_write_port_holder_is_combinational() {
    let module = lower(&MemoryDescriptor::new(8, 4).with_ports(0, 0, 1).with_latency(1, 1)).unwrap();
    let blocks = module.always_constructs();
    assert_eq!(blocks.iter().filter(|(event, _)| **event == Event::Comb).count(), 1);
    // No stages: only the write block is clocked.
    assert_eq!(blocks.iter().filter(|(event, _)| matches!(event, Event::PosEdge(_))).count(), 1);
    assert!(module.to_string().contains("RW0_rdata_hold = Memory[RW0_addr];"));
}

#[test]
fn lowering_is_idempotent() {
    let descriptor = MemoryDescriptor::new(16, 100).with_ports(2, 1, 1).with_latency(2, 3);
    let first = lower(&descriptor).unwrap();
    let second = lower(&descriptor).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn signal_count_is_checked() {
    let descriptor = MemoryDescriptor::new(8, 4).with_ports(1, 0, 0);
    let mut port_decls = descriptor.port_decls();
    port_decls.insert(0, PortDeclaration::input(1, "extra".to_string()));
    assert_eq!(
        lower_memory(&Context::new(), "mem", port_decls, &descriptor, &MemSimOptions::default()),
        Err(LowerError::SignalCountMismatch { expected: 3, actual: 4 })
    );
}

#[test]
fn invalid_descriptors_are_rejected() {
    assert!(matches!(
        lower(&MemoryDescriptor::new(8, 4).with_ports(0, 1, 0).with_latency(1, 0)),
        Err(LowerError::InvalidDescriptor(_))
    ));
    assert!(matches!(
        lower(&MemoryDescriptor::new(8, 4).with_ports(0, 0, 1).with_latency(0, 0)),
        Err(LowerError::InvalidDescriptor(_))
    ));
    assert!(matches!(lower(&MemoryDescriptor::new(0, 4)), Err(LowerError::InvalidDescriptor(_))));
}

#[test]
fn mask_width_is_checked() {
    let descriptor = MemoryDescriptor::new(8, 4).with_ports(0, 1, 0).with_latency(1, 1);
    let port_decls = descriptor
        .port_decls()
        .into_iter()
        .map(|port| if port.name() == "W0_mask" { PortDeclaration::input(8, "W0_mask".to_string()) } else { port })
        .collect::<Vec<_>>();
    assert!(matches!(
        lower_memory(&Context::new(), "mem", port_decls, &descriptor, &MemSimOptions::default()),
        Err(LowerError::PortWidthMismatch { port, field, expected: 1, actual: 8 }) if port == "W0" && field == "mask"
    ));
}
