//! Incremental construction of Verilog IR modules.

use std::collections::HashSet;

use thiserror::Error;

use super::*;
use crate::utils::join_options;

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("module has {expected} output ports but {actual} output values were given")]
    OutputCountMismatch { expected: usize, actual: usize },

    #[error("output port `{port}` is {expected} bits wide but its value is {actual} bits wide")]
    OutputWidthMismatch { port: String, expected: usize, actual: usize },
}

/// A value handle: an expression of known width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    expr: Expression,
    width: usize,
}

impl Signal {
    /// Creates new signal.
    pub fn new(expr: Expression, width: usize) -> Self { Self { expr, width } }

    /// Signal referring to a declared identifier.
    pub fn ident(name: &str, width: usize) -> Self { Self::new(Expression::ident(name.to_string()), width) }

    /// Don't-care signal.
    pub fn x(width: usize) -> Self { Self::new(Expression::x(width), width) }

    /// Returns the expression.
    pub fn expr(&self) -> &Expression { &self.expr }

    /// Converts into the expression.
    pub fn into_expr(self) -> Expression { self.expr }

    /// Returns the width.
    pub fn width(&self) -> usize { self.width }
}

/// Naming context threaded through every construction call.
///
/// A context is immutable: entering a scope returns a new context.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Context {
    /// Scopes in the context
    scopes: Vec<String>,
}

impl Context {
    /// Creates new context.
    pub fn new() -> Self { Self::default() }

    /// Returns a context with the given scope entered.
    #[must_use]
    pub fn scoped(&self, scope_name: &str) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(scope_name.to_string());
        Self { scopes }
    }

    /// Returns prefix of the inner scope.
    pub fn get_prefix(&self) -> Option<String> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(self.scopes.join("_"))
        }
    }

    /// Returns `name` qualified by the scope prefix.
    pub fn name(&self, name: &str) -> String {
        join_options("_", [self.get_prefix(), Some(name.to_string())]).unwrap_or_default()
    }
}

/// Storage array handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    name: String,
    width: usize,
    depth: usize,
}

impl Storage {
    /// Array name.
    pub fn name(&self) -> &str { &self.name }

    /// Word width.
    pub fn width(&self) -> usize { self.width }

    /// Number of words.
    pub fn depth(&self) -> usize { self.depth }

    /// Assignable word at `address`.
    pub fn slot(&self, address: &Signal) -> Expression {
        Expression::ident(self.name.clone()).with_index(address.expr().clone())
    }

    /// Combinational read of the word at `address`.
    pub fn read(&self, address: &Signal) -> Signal { Signal::new(self.slot(address), self.width) }
}

#[derive(Debug)]
struct Branch {
    cond: Expression,
    then_stmts: Vec<Statement>,
    else_stmts: Option<Vec<Statement>>,
}

/// Builds a statement tree with explicit `begin_if` / `begin_else` / `end_if` calls.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    stmts: Vec<Statement>,
    branches: Vec<Branch>,
}

impl BlockBuilder {
    /// Creates new block builder.
    pub fn new() -> Self { Self::default() }

    fn current(&mut self) -> &mut Vec<Statement> {
        match self.branches.last_mut() {
            None => &mut self.stmts,
            Some(Branch { else_stmts: Some(stmts), .. }) => stmts,
            Some(Branch { then_stmts, .. }) => then_stmts,
        }
    }

    /// Appends a blocking assignment.
    pub fn blocking(&mut self, lvalue: Expression, expr: Expression) -> &mut Self {
        self.current().push(Statement::blocking_assignment(lvalue, expr));
        self
    }

    /// Appends a nonblocking assignment.
    pub fn nonblocking(&mut self, lvalue: Expression, expr: Expression) -> &mut Self {
        self.current().push(Statement::nonblocking_assignment(lvalue, expr));
        self
    }

    /// Opens the then-branch of a conditional.
    pub fn begin_if(&mut self, cond: Expression) -> &mut Self {
        self.branches.push(Branch { cond, then_stmts: Vec::new(), else_stmts: None });
        self
    }

    /// Switches the innermost conditional to its else-branch.
    pub fn begin_else(&mut self) -> &mut Self {
        let branch = self.branches.last_mut().expect("begin_else: no open conditional");
        assert!(branch.else_stmts.is_none(), "begin_else: else-branch already open");
        branch.else_stmts = Some(Vec::new());
        self
    }

    /// Closes the innermost conditional.
    pub fn end_if(&mut self) -> &mut Self {
        let branch = self.branches.pop().expect("end_if: no open conditional");
        let stmt = Statement::Conditional(branch.cond, branch.then_stmts, branch.else_stmts.unwrap_or_default());
        self.current().push(stmt);
        self
    }

    /// Returns the assembled statements.
    pub fn finish(self) -> Vec<Statement> {
        assert!(self.branches.is_empty(), "finish: {} conditionals left open", self.branches.len());
        self.stmts
    }
}

/// Appends declarations, assignments and `always` constructs to a module under construction.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    port_decls: Vec<PortDeclaration>,
    /// Finished top-level items.
    module_items: Vec<ModuleItem>,
    /// Open commented sections, innermost last.
    sections: Vec<(String, Vec<ModuleItem>)>,
    names: HashSet<String>,
}

impl ModuleBuilder {
    /// Creates a builder for a module with the given port signature.
    pub fn new(name: String, port_decls: Vec<PortDeclaration>) -> Self {
        let names = port_decls.iter().map(|port| port.name().to_string()).collect();
        Self { name, port_decls, module_items: Vec::new(), sections: Vec::new(), names }
    }

    /// Input signals, in port order.
    pub fn inputs(&self) -> Vec<Signal> {
        self.port_decls.iter().filter(|port| port.is_input()).map(|port| Signal::ident(port.name(), port.width())).collect()
    }

    /// Output port declarations, in port order.
    pub fn outputs(&self) -> Vec<&PortDeclaration> { self.port_decls.iter().filter(|port| !port.is_input()).collect() }

    /// Reserves a fresh identifier. On collision, appends the smallest free index.
    fn alloc_name(&mut self, name: String) -> String {
        let final_name = if self.names.contains(&name) {
            let mut idx = 1;
            while self.names.contains(&format!("{}_{}", name, idx)) {
                idx += 1;
            }
            format!("{}_{}", name, idx)
        } else {
            name
        };
        self.names.insert(final_name.clone());
        final_name
    }

    fn push(&mut self, item: ModuleItem) {
        match self.sections.last_mut() {
            Some((_, items)) => items.push(item),
            None => self.module_items.push(item),
        }
    }

    /// Opens a commented section. Items added until the matching `leave_section` are grouped under `title`.
    pub fn enter_section(&mut self, title: String) { self.sections.push((title, Vec::new())); }

    /// Closes the innermost commented section.
    pub fn leave_section(&mut self) {
        let (title, items) = self.sections.pop().expect("leave_section: no open section");
        if !items.is_empty() {
            let end = format!("End {}", title);
            self.push(ModuleItem::Commented(title, Some(end), items));
        }
    }

    /// Declares an array of `depth` words of `width` bits.
    pub fn add_storage(&mut self, ctx: &Context, name: &str, width: usize, depth: usize) -> Storage {
        let name = self.alloc_name(ctx.name(name));
        self.push(ModuleItem::Declarations(vec![Declaration::array(width, depth, name.clone())]));
        Storage { name, width, depth }
    }

    /// Declares a register.
    pub fn add_reg(&mut self, ctx: &Context, name: &str, width: usize) -> Signal {
        let name = self.alloc_name(ctx.name(name));
        self.push(ModuleItem::Declarations(vec![Declaration::reg(width, name.clone())]));
        Signal::ident(&name, width)
    }

    /// Declares a net driven by `expr`.
    pub fn add_net(&mut self, ctx: &Context, name: &str, expr: Expression, width: usize) -> Signal {
        let name = self.alloc_name(ctx.name(name));
        self.push(ModuleItem::Declarations(vec![Declaration::net(width, name.clone())]));
        self.push(ModuleItem::ContinuousAssigns(vec![ContinuousAssign::new(Expression::ident(name.clone()), expr)]));
        Signal::ident(&name, width)
    }

    /// Adds `always @(posedge clock)`.
    pub fn always_ff(&mut self, clock: &Signal, stmts: Vec<Statement>) {
        self.push(ModuleItem::AlwaysConstruct(Event::PosEdge(clock.expr().clone()), stmts));
    }

    /// Adds `always @*`.
    pub fn always_comb(&mut self, stmts: Vec<Statement>) { self.push(ModuleItem::AlwaysConstruct(Event::Comb, stmts)); }

    /// Drives the output ports, in order, with `values`.
    pub fn set_outputs(&mut self, values: Vec<Signal>) -> Result<(), BuildError> {
        let outputs = self.outputs().into_iter().map(|port| (port.name().to_string(), port.width())).collect::<Vec<_>>();
        if outputs.len() != values.len() {
            return Err(BuildError::OutputCountMismatch { expected: outputs.len(), actual: values.len() });
        }

        let mut conts = Vec::new();
        for ((port, width), value) in outputs.into_iter().zip(values) {
            if width != value.width() {
                return Err(BuildError::OutputWidthMismatch { port, expected: width, actual: value.width() });
            }
            conts.push(ContinuousAssign::new(Expression::ident(port), value.into_expr()));
        }

        if !conts.is_empty() {
            self.push(ModuleItem::ContinuousAssigns(conts));
        }
        Ok(())
    }

    /// Returns the finished module.
    pub fn finish(self) -> Module {
        assert!(self.sections.is_empty(), "finish: {} sections left open", self.sections.len());
        Module { name: self.name, port_decls: self.port_decls, module_items: self.module_items }
    }
}
