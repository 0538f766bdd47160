mod memories;

use std::path::Path;

use memsim::memgen::memory_schema;
use memsim::{Design, DesignError, MemSimPass};

const GENERATOR: &str = "FIRRTLMem";

fn main() -> Result<(), DesignError> {
    env_logger::init();

    let mut design = Design::new();
    design.add_schema(memory_schema(GENERATOR))?;
    design.add_module(memories::scratchpad().generated_module("scratchpad", GENERATOR))?;
    design.add_module(memories::regfile().generated_module("regfile", GENERATOR))?;
    design.add_module(memories::sram().generated_module("sram", GENERATOR))?;
    design.add_module(memories::pipelined_buffer().generated_module("pipelined_buffer", GENERATOR))?;
    design.add_module(memories::blackhole().generated_module("blackhole", GENERATOR))?;

    let lowered = MemSimPass::default().run(&mut design)?;
    log::info!("lowered {} memories", lowered.len());

    design.gen_vir(Path::new("./build"))
}
