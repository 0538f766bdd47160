//! Four-state cycle simulator for behavioral modules.
//!
//! Supports the subset of the Verilog IR that memory lowering emits: nets driven by continuous assigns,
//! registers written by `always @(posedge clk)` blocks with nonblocking assignments, registers driven by
//! `always @*` blocks with blocking assignments, and arrays indexed by an expression.
//!
//! Registers and arrays start out as `x`. Nets and combinationally driven registers are evaluated on demand.

use std::collections::HashMap;

use thiserror::Error;

use crate::some_or;
use crate::vir::{
    BinaryOp, ContinuousAssign, Declaration, Event, Expression, LogicValues, Module, ModuleItem, Primary, Statement,
};

/// Maximum nesting of net evaluations before a combinational loop is reported.
const MAX_EVAL_DEPTH: usize = 1024;

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("unknown signal `{0}`")]
    UnknownSignal(String),

    #[error("`{0}` is not an input port")]
    NotAnInput(String),

    #[error("unknown memory `{0}`")]
    UnknownMemory(String),

    #[error("address {address} is out of range for memory `{memory}` of depth {depth}")]
    AddressOutOfRange { memory: String, address: usize, depth: usize },

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("combinational loop through `{0}`")]
    CombinationalLoop(String),
}

#[derive(Debug, Clone)]
struct Memory {
    width: usize,
    words: Vec<LogicValues>,
}

#[derive(Debug)]
enum Update {
    Reg(String, LogicValues),
    Word(String, usize, LogicValues),
}

type Locals = HashMap<String, LogicValues>;

/// Simulator state of one module.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    /// Widths of all scalar signals.
    widths: HashMap<String, usize>,
    inputs: HashMap<String, LogicValues>,
    /// Registers written on clock edges.
    regs: HashMap<String, LogicValues>,
    memories: HashMap<String, Memory>,
    drivers: HashMap<String, Expression>,
    comb_blocks: Vec<Vec<Statement>>,
    /// Registers driven by `always @*` blocks, with the index of their block.
    comb_regs: HashMap<String, usize>,
    seq_blocks: Vec<(String, Vec<Statement>)>,
    cycle: usize,
}

fn blocking_targets<'a>(stmts: &'a [Statement], acc: &mut Vec<&'a str>) {
    for stmt in stmts {
        match stmt {
            Statement::BlockingAssignment(lvalue, _) => acc.extend(lvalue.as_ident()),
            Statement::Conditional(_, then_stmts, else_stmts) => {
                blocking_targets(then_stmts, acc);
                blocking_targets(else_stmts, acc);
            }
            Statement::NonblockingAssignment(..) => {}
        }
    }
}

fn to_address(value: &LogicValues) -> Option<usize> { value.to_u64().and_then(|value| usize::try_from(value).ok()) }

impl Simulator {
    /// Creates new simulator. All inputs, registers and array words are `x`.
    pub fn new(module: &Module) -> Result<Self, SimError> {
        let mut sim = Self::default();

        for port in &module.port_decls {
            let _ = sim.widths.insert(port.name().to_string(), port.width());
            if port.is_input() {
                let _ = sim.inputs.insert(port.name().to_string(), LogicValues::x(port.width()));
            }
        }

        for decl in module.declarations() {
            let shape = decl.shape();
            let name = decl.name().to_string();
            match (decl, shape.dim()) {
                (Declaration::Net(..), 1) => {
                    let _ = sim.widths.insert(name, shape.width());
                }
                (Declaration::Reg(..), 1) => {
                    let _ = sim.widths.insert(name.clone(), shape.width());
                    let _ = sim.regs.insert(name, LogicValues::x(shape.width()));
                }
                (Declaration::Reg(..), 2) => {
                    let width = shape.get(1);
                    let words = vec![LogicValues::x(width); shape.get(0)];
                    let _ = sim.memories.insert(name, Memory { width, words });
                }
                _ => return Err(SimError::Unsupported(format!("declaration of `{}`", name))),
            }
        }

        for item in module.items() {
            match item {
                ModuleItem::ContinuousAssigns(conts) => {
                    for ContinuousAssign(lvalue, expr) in conts {
                        let name = some_or!(
                            lvalue.as_ident(),
                            return Err(SimError::Unsupported(format!("assignment to `{}`", lvalue.to_string())))
                        );
                        let _ = sim.drivers.insert(name.to_string(), expr.clone());
                    }
                }
                ModuleItem::AlwaysConstruct(Event::Comb, stmts) => {
                    let mut targets = Vec::new();
                    blocking_targets(stmts, &mut targets);
                    for target in targets {
                        let _ = sim.regs.remove(target);
                        let _ = sim.comb_regs.insert(target.to_string(), sim.comb_blocks.len());
                    }
                    sim.comb_blocks.push(stmts.clone());
                }
                ModuleItem::AlwaysConstruct(Event::PosEdge(clock), stmts) => {
                    let clock = some_or!(
                        clock.as_ident(),
                        return Err(SimError::Unsupported(format!("clock expression `{}`", clock.to_string())))
                    );
                    sim.seq_blocks.push((clock.to_string(), stmts.clone()));
                }
                ModuleItem::Declarations(_) | ModuleItem::Commented(..) => {}
            }
        }

        log::trace!(
            "simulating `{}`: {} register(s), {} array(s), {} clocked block(s)",
            module.name,
            sim.regs.len(),
            sim.memories.len(),
            sim.seq_blocks.len()
        );
        Ok(sim)
    }

    /// Number of `tick`s so far.
    pub fn cycle(&self) -> usize { self.cycle }

    /// Drives an input port with `value`. Bits above the port width are dropped.
    pub fn set(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let input = self.input_mut(name)?;
        *input = LogicValues::from_u64(input.width(), value);
        Ok(())
    }

    /// Drives an input port with `x`.
    pub fn set_x(&mut self, name: &str) -> Result<(), SimError> {
        let input = self.input_mut(name)?;
        *input = LogicValues::x(input.width());
        Ok(())
    }

    fn input_mut(&mut self, name: &str) -> Result<&mut LogicValues, SimError> {
        if !self.inputs.contains_key(name) {
            return Err(if self.widths.contains_key(name) {
                SimError::NotAnInput(name.to_string())
            } else {
                SimError::UnknownSignal(name.to_string())
            });
        }
        self.inputs.get_mut(name).ok_or_else(|| SimError::UnknownSignal(name.to_string()))
    }

    /// Current value of a signal.
    pub fn get(&self, name: &str) -> Result<LogicValues, SimError> { self.value(name, 0) }

    /// Current value of a signal as an integer, or `None` if any bit is unknown.
    pub fn get_u64(&self, name: &str) -> Result<Option<u64>, SimError> { Ok(self.get(name)?.to_u64()) }

    /// Word `address` of the array `name`.
    pub fn memory(&self, name: &str, address: usize) -> Result<LogicValues, SimError> {
        let memory = some_or!(self.memories.get(name), return Err(SimError::UnknownMemory(name.to_string())));
        memory.words.get(address).cloned().ok_or_else(|| SimError::AddressOutOfRange {
            memory: name.to_string(),
            address,
            depth: memory.words.len(),
        })
    }

    /// Overwrites word `address` of the array `name`.
    pub fn set_memory(&mut self, name: &str, address: usize, value: u64) -> Result<(), SimError> {
        let memory = some_or!(self.memories.get_mut(name), return Err(SimError::UnknownMemory(name.to_string())));
        let depth = memory.words.len();
        let word = some_or!(
            memory.words.get_mut(address),
            return Err(SimError::AddressOutOfRange { memory: name.to_string(), address, depth })
        );
        *word = LogicValues::from_u64(memory.width, value);
        Ok(())
    }

    /// Fires every clocked block at once, as if all clocks rose together.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.fire(|_| true)?;
        self.cycle += 1;
        Ok(())
    }

    /// Fires the clocked blocks of `clock` only.
    pub fn posedge(&mut self, clock: &str) -> Result<(), SimError> {
        if !self.inputs.contains_key(clock) {
            return Err(SimError::NotAnInput(clock.to_string()));
        }
        self.fire(|name| name == clock)
    }

    /// Evaluates all right-hand sides first, then commits them: nonblocking semantics.
    fn fire<F: Fn(&str) -> bool>(&mut self, select: F) -> Result<(), SimError> {
        let mut updates = Vec::new();
        for (clock, stmts) in &self.seq_blocks {
            if select(clock) {
                self.exec_clocked(stmts, &mut updates)?;
            }
        }

        log::trace!("cycle {}: committing {} update(s)", self.cycle, updates.len());
        for update in updates {
            match update {
                Update::Reg(name, value) => {
                    let reg = some_or!(self.regs.get_mut(&name), return Err(SimError::UnknownSignal(name)));
                    *reg = value.resize(reg.width());
                }
                Update::Word(name, address, value) => {
                    let memory = some_or!(self.memories.get_mut(&name), return Err(SimError::UnknownMemory(name)));
                    let width = memory.width;
                    match memory.words.get_mut(address) {
                        Some(word) => *word = value.resize(width),
                        None => log::trace!("ignoring write to `{}[{}]`: out of range", name, address),
                    }
                }
            }
        }
        Ok(())
    }

    fn exec_clocked(&self, stmts: &[Statement], updates: &mut Vec<Update>) -> Result<(), SimError> {
        let locals = Locals::new();
        for stmt in stmts {
            match stmt {
                Statement::NonblockingAssignment(lvalue, expr) => {
                    let value = self.eval(expr, &locals, 0)?;
                    match lvalue {
                        Expression::Primary(Primary::HierarchicalIdentifier(name, None)) => {
                            updates.push(Update::Reg(name.clone(), value));
                        }
                        Expression::Primary(Primary::HierarchicalIdentifier(name, Some(index))) => {
                            match to_address(&self.eval(index, &locals, 0)?) {
                                Some(address) => updates.push(Update::Word(name.clone(), address, value)),
                                None => log::trace!("ignoring write to `{}` at an unknown address", name),
                            }
                        }
                        _ => return Err(SimError::Unsupported(format!("assignment to `{}`", lvalue.to_string()))),
                    }
                }
                Statement::Conditional(cond, then_stmts, else_stmts) => {
                    let taken = if self.eval(cond, &locals, 0)?.is_true() { then_stmts } else { else_stmts };
                    self.exec_clocked(taken, updates)?;
                }
                Statement::BlockingAssignment(..) => {
                    return Err(SimError::Unsupported("blocking assignment in a clocked block".to_string()))
                }
            }
        }
        Ok(())
    }

    fn exec_comb(&self, stmts: &[Statement], locals: &mut Locals, depth: usize) -> Result<(), SimError> {
        for stmt in stmts {
            match stmt {
                Statement::BlockingAssignment(lvalue, expr) => {
                    let value = self.eval(expr, locals, depth)?;
                    let name = some_or!(
                        lvalue.as_ident(),
                        return Err(SimError::Unsupported(format!("assignment to `{}`", lvalue.to_string())))
                    );
                    let _ = locals.insert(name.to_string(), value);
                }
                Statement::Conditional(cond, then_stmts, else_stmts) => {
                    let taken = if self.eval(cond, locals, depth)?.is_true() { then_stmts } else { else_stmts };
                    self.exec_comb(taken, locals, depth)?;
                }
                Statement::NonblockingAssignment(..) => {
                    return Err(SimError::Unsupported("nonblocking assignment in a combinational block".to_string()))
                }
            }
        }
        Ok(())
    }

    fn value(&self, name: &str, depth: usize) -> Result<LogicValues, SimError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(SimError::CombinationalLoop(name.to_string()));
        }

        if let Some(value) = self.inputs.get(name).or_else(|| self.regs.get(name)) {
            return Ok(value.clone());
        }
        if let Some(expr) = self.drivers.get(name) {
            let width = self.widths.get(name).copied();
            let value = self.eval(expr, &Locals::new(), depth + 1)?;
            return Ok(match width {
                Some(width) => value.resize(width),
                None => value,
            });
        }
        if let Some(&index) = self.comb_regs.get(name) {
            let mut locals = Locals::new();
            self.exec_comb(&self.comb_blocks[index], &mut locals, depth + 1)?;
            let width = self.widths.get(name).copied().unwrap_or_default();
            return Ok(locals.remove(name).map_or_else(|| LogicValues::x(width), |value| value.resize(width)));
        }

        // Declared but undriven.
        let width = some_or!(self.widths.get(name), return Err(SimError::UnknownSignal(name.to_string())));
        Ok(LogicValues::x(*width))
    }

    fn eval(&self, expr: &Expression, locals: &Locals, depth: usize) -> Result<LogicValues, SimError> {
        match expr {
            Expression::Primary(prim) => self.eval_primary(prim, locals, depth),
            Expression::Binary(lhs, op, rhs) => {
                let lhs = self.eval(lhs, locals, depth)?;
                let rhs = self.eval(rhs, locals, depth)?;
                match op {
                    BinaryOp::And if lhs.width() != rhs.width() => Err(SimError::Unsupported(format!(
                        "`{}` on operands of different widths",
                        expr.to_string()
                    ))),
                    BinaryOp::And => Ok(&lhs & &rhs),
                    BinaryOp::EqArithmetic => Ok(lhs.eq_arith(&rhs)),
                }
            }
            Expression::Conditional(cond, then_expr, else_expr) => {
                let cond = self.eval(cond, locals, depth)?;
                if cond.is_true() {
                    self.eval(then_expr, locals, depth)
                } else if cond.is_known() {
                    self.eval(else_expr, locals, depth)
                } else {
                    let then_value = self.eval(then_expr, locals, depth)?;
                    let else_value = self.eval(else_expr, locals, depth)?;
                    if then_value.width() != else_value.width() {
                        return Err(SimError::Unsupported(format!(
                            "`{}` with branches of different widths",
                            expr.to_string()
                        )));
                    }
                    Ok(then_value.merge(&else_value))
                }
            }
        }
    }

    fn eval_primary(&self, prim: &Primary, locals: &Locals, depth: usize) -> Result<LogicValues, SimError> {
        match prim {
            Primary::Number(bits) => Ok(bits.clone()),
            Primary::HierarchicalIdentifier(name, None) => match locals.get(name) {
                Some(value) => Ok(value.clone()),
                None => self.value(name, depth),
            },
            Primary::HierarchicalIdentifier(name, Some(index)) => {
                let memory = some_or!(self.memories.get(name), return Err(SimError::UnknownMemory(name.to_string())));
                let address = self.eval(index, locals, depth)?;
                Ok(to_address(&address)
                    .and_then(|address| memory.words.get(address))
                    .cloned()
                    .unwrap_or_else(|| LogicValues::x(memory.width)))
            }
            Primary::MintypmaxExpression(expr) => self.eval(expr, locals, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vir::{BlockBuilder, Context, ModuleBuilder, PortDeclaration, Signal};

    /// `q <= d` on `clk`, with `y = sel ? q : d`.
    fn flop() -> Module {
        let mut builder = ModuleBuilder::new("flop".to_string(), vec![
            PortDeclaration::input(1, "clk".to_string()),
            PortDeclaration::input(1, "sel".to_string()),
            PortDeclaration::input(4, "d".to_string()),
            PortDeclaration::output(4, "y".to_string()),
        ]);
        let inputs = builder.inputs();
        let q = builder.add_reg(&Context::new(), "q", 4);
        let mut block = BlockBuilder::new();
        block.nonblocking(q.expr().clone(), inputs[2].expr().clone());
        builder.always_ff(&inputs[0], block.finish());
        let y = Expression::conditional(inputs[1].expr().clone(), q.into_expr(), inputs[2].expr().clone());
        builder.set_outputs(vec![Signal::new(y, 4)]).unwrap();
        builder.finish()
    }

    #[test]
    fn registers_start_unknown_and_capture_on_tick() {
        let mut sim = Simulator::new(&flop()).unwrap();
        sim.set("sel", 1).unwrap();
        sim.set("d", 9).unwrap();
        assert!(sim.get("y").unwrap().is_x());

        sim.tick().unwrap();
        assert_eq!(sim.get_u64("y").unwrap(), Some(9));
        assert_eq!(sim.cycle(), 1);

        sim.set("d", 3).unwrap();
        assert_eq!(sim.get_u64("y").unwrap(), Some(9));
        sim.set("sel", 0).unwrap();
        assert_eq!(sim.get_u64("y").unwrap(), Some(3));
    }

    #[test]
    fn unknown_select_merges_branches() {
        let mut sim = Simulator::new(&flop()).unwrap();
        sim.set("d", 0b1010).unwrap();
        sim.tick().unwrap();
        sim.set("d", 0b1001).unwrap();
        sim.set_x("sel").unwrap();
        assert_eq!(sim.get("y").unwrap().to_string(), "10xx");
    }

    #[test]
    fn posedge_fires_one_clock() {
        let mut sim = Simulator::new(&flop()).unwrap();
        sim.set("sel", 1).unwrap();
        sim.set("d", 5).unwrap();
        sim.posedge("clk").unwrap();
        assert_eq!(sim.get_u64("y").unwrap(), Some(5));
        assert_eq!(sim.cycle(), 0);
        assert_eq!(sim.posedge("q"), Err(SimError::NotAnInput("q".to_string())));
    }

    #[test]
    fn only_inputs_can_be_driven() {
        let mut sim = Simulator::new(&flop()).unwrap();
        assert_eq!(sim.set("y", 1), Err(SimError::NotAnInput("y".to_string())));
        assert_eq!(sim.set("nope", 1), Err(SimError::UnknownSignal("nope".to_string())));
        assert_eq!(sim.get("nope"), Err(SimError::UnknownSignal("nope".to_string())));
    }

    #[test]
    fn arrays_are_bounds_checked() {
        let mut builder = ModuleBuilder::new("ram".to_string(), vec![]);
        let _ = builder.add_storage(&Context::new(), "Memory", 8, 2);
        let mut sim = Simulator::new(&builder.finish()).unwrap();

        assert!(sim.memory("Memory", 1).unwrap().is_x());
        sim.set_memory("Memory", 1, 0x5a).unwrap();
        assert_eq!(sim.memory("Memory", 1).unwrap().to_u64(), Some(0x5a));
        assert_eq!(
            sim.memory("Memory", 2),
            Err(SimError::AddressOutOfRange { memory: "Memory".to_string(), address: 2, depth: 2 })
        );
        assert_eq!(sim.memory("ram", 0), Err(SimError::UnknownMemory("ram".to_string())));
    }
}
