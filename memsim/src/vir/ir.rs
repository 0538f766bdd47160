//! Verilog IR.

use itertools::Itertools;
use static_assertions::assert_impl_all;

use super::LogicValues;
use crate::utils::indent;

const INDENT: usize = 4;

/// Shape of an array. The first dimension is the outermost one.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    inner: Vec<usize>,
}

impl Shape {
    /// Creates new shape.
    pub fn new<I: IntoIterator<Item = usize>>(iterable: I) -> Self { Self { inner: iterable.into_iter().collect() } }

    /// Returns dimension of array.
    pub fn dim(&self) -> usize { self.inner.len() }

    /// Returns number of bits in array.
    pub fn width(&self) -> usize { self.inner.iter().product() }

    /// Returns the size of the `index`-th dimension.
    pub fn get(&self, index: usize) -> usize {
        assert!(self.dim() > index);
        self.inner[index]
    }
}

/// Module.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Module {
    /// Module name.
    pub name: String,

    /// Port declarations.
    pub port_decls: Vec<PortDeclaration>,

    /// Module items.
    pub module_items: Vec<ModuleItem>,
}

assert_impl_all!(Module: Send, Sync, Clone);

impl ToString for Module {
    fn to_string(&self) -> String {
        format!(
            "`timescale 1ns / 1ps\n\nmodule {}\n(\n{}\n);\n\n{}\n\nendmodule",
            self.name,
            indent(self.port_decls.iter().map(|port_decl| port_decl.to_string()).join(",\n"), INDENT),
            gen_verilog_module(&self.module_items)
        )
    }
}

impl Module {
    /// Input port declarations, in order.
    pub fn inputs(&self) -> impl Iterator<Item = &PortDeclaration> { self.port_decls.iter().filter(|p| p.is_input()) }

    /// Output port declarations, in order.
    pub fn outputs(&self) -> impl Iterator<Item = &PortDeclaration> { self.port_decls.iter().filter(|p| !p.is_input()) }

    /// Iterates over all module items, descending into commented groups.
    pub fn items(&self) -> Vec<&ModuleItem> {
        fn walk<'a>(items: &'a [ModuleItem], acc: &mut Vec<&'a ModuleItem>) {
            for item in items {
                match item {
                    ModuleItem::Commented(_, _, inner) => walk(inner, acc),
                    _ => acc.push(item),
                }
            }
        }

        let mut acc = Vec::new();
        walk(&self.module_items, &mut acc);
        acc
    }

    /// All declarations of the module.
    pub fn declarations(&self) -> Vec<&Declaration> {
        self.items()
            .into_iter()
            .flat_map(|item| match item {
                ModuleItem::Declarations(decls) => decls.iter().collect::<Vec<_>>(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// All `always` constructs of the module.
    pub fn always_constructs(&self) -> Vec<(&Event, &[Statement])> {
        self.items()
            .into_iter()
            .filter_map(|item| match item {
                ModuleItem::AlwaysConstruct(event, stmts) => Some((event, stmts.as_slice())),
                _ => None,
            })
            .collect()
    }
}

/// Module item.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ModuleItem {
    /// Declarations.
    Declarations(Vec<Declaration>),

    /// Continuous assignments.
    ContinuousAssigns(Vec<ContinuousAssign>),

    /// Always construct.
    AlwaysConstruct(Event, Vec<Statement>),

    /// Comment. (Comment before items, comment after items, items)
    Commented(String, Option<String>, Vec<ModuleItem>),
}

impl ToString for ModuleItem {
    fn to_string(&self) -> String {
        match self {
            ModuleItem::Declarations(decls) => decls.iter().map(|decl| decl.to_string()).join("\n"),
            ModuleItem::ContinuousAssigns(conts) => conts.iter().map(|cont| cont.to_string()).join("\n"),
            ModuleItem::AlwaysConstruct(event, stmts) => {
                format!(
                    "{} begin\n{}\nend",
                    event.to_string(),
                    indent(stmts.iter().map(|stmt| stmt.to_string()).join("\n"), INDENT)
                )
            }
            ModuleItem::Commented(comment_before, comment_after, items) => {
                format!(
                    "/*\n{}\n*/\n{}{}",
                    indent(comment_before.clone(), INDENT),
                    gen_verilog_module(items),
                    comment_after.as_ref().map_or("".to_string(), |c| format!("\n/* {} */", c))
                )
            }
        }
    }
}

/// Generates Verilog code for module items.
pub fn gen_verilog_module(module: &[ModuleItem]) -> String { module.iter().map(|item| item.to_string()).join("\n\n") }

/// Event control of an `always` construct.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    /// `always @(posedge clock)`
    PosEdge(Expression),

    /// `always @*`
    Comb,
}

impl ToString for Event {
    fn to_string(&self) -> String {
        match self {
            Event::PosEdge(clock) => format!("always @(posedge {})", clock.to_string()),
            Event::Comb => "always @*".to_string(),
        }
    }
}

/// Port declaration.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum PortDeclaration {
    /// Input declaration.
    Input(usize, String),

    /// Output declaration.
    Output(usize, String),
}

impl ToString for PortDeclaration {
    fn to_string(&self) -> String {
        let (dir, width, ident) = match self {
            Self::Input(width, ident) => ("input", width, ident),
            Self::Output(width, ident) => ("output", width, ident),
        };
        if *width > 1 {
            format!("{} wire [{}-1:0] {}", dir, width, ident)
        } else {
            format!("{} wire {}", dir, ident)
        }
    }
}

impl PortDeclaration {
    /// Creates new input port declaration.
    pub fn input(width: usize, ident: String) -> Self { Self::Input(width, ident) }

    /// Creates new output port declaration.
    pub fn output(width: usize, ident: String) -> Self { Self::Output(width, ident) }

    /// Port name.
    pub fn name(&self) -> &str {
        match self {
            Self::Input(_, ident) | Self::Output(_, ident) => ident,
        }
    }

    /// Port width.
    pub fn width(&self) -> usize {
        match self {
            Self::Input(width, _) | Self::Output(width, _) => *width,
        }
    }

    /// Returns `true` for input ports.
    pub fn is_input(&self) -> bool { matches!(self, Self::Input(..)) }
}

/// Declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Declaration {
    /// Net declaration.
    Net(Shape, String),

    /// Reg declaration. A two-dimensional shape `[depth, width]` declares an array.
    Reg(Shape, String),
}

impl Declaration {
    /// Net declaration.
    #[inline]
    pub fn net(width: usize, ident: String) -> Self { Declaration::Net(Shape::new([width]), ident) }

    /// Reg declaration.
    #[inline]
    pub fn reg(width: usize, ident: String) -> Self { Declaration::Reg(Shape::new([width]), ident) }

    /// Array of `depth` words of `width` bits.
    #[inline]
    pub fn array(width: usize, depth: usize, ident: String) -> Self { Declaration::Reg(Shape::new([depth, width]), ident) }

    /// Declared identifier.
    pub fn name(&self) -> &str {
        match self {
            Self::Net(_, ident) | Self::Reg(_, ident) => ident,
        }
    }

    /// Declared shape.
    pub fn shape(&self) -> &Shape {
        match self {
            Self::Net(shape, _) | Self::Reg(shape, _) => shape,
        }
    }
}

impl ToString for Declaration {
    /// Generates verilog code.
    fn to_string(&self) -> String {
        let (kind, shape, ident) = match self {
            Self::Net(shape, ident) => ("wire", shape, ident),
            Self::Reg(shape, ident) => ("reg", shape, ident),
        };
        match shape.dim() {
            2 => format!("{} [{}-1:0] {}[{}-1:0];", kind, shape.get(1), ident, shape.get(0)),
            1 if shape.width() > 1 => format!("{} [{}-1:0] {};", kind, shape.width(), ident),
            1 => format!("{} {};", kind, ident),
            _ => unimplemented!(),
        }
    }
}

/// Continuous assign.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ContinuousAssign(pub Expression, pub Expression);

impl ToString for ContinuousAssign {
    fn to_string(&self) -> String { format!("assign {} = {};", self.0.to_string(), self.1.to_string()) }
}

impl ContinuousAssign {
    /// Creates new continuous assign.
    pub fn new(lvalue: Expression, expr: Expression) -> Self { Self(lvalue, expr) }
}

/// Statement.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    /// Blocking assignment.
    BlockingAssignment(Expression, Expression),

    /// Conditional statement.
    Conditional(Expression, Vec<Statement>, Vec<Statement>),

    /// Nonblocking assignment.
    NonblockingAssignment(Expression, Expression),
}

impl Statement {
    /// Blocking assignment.
    #[inline]
    pub fn blocking_assignment(lvalue: Expression, expr: Expression) -> Self {
        assert!(lvalue.is_lvalue(), "lvalue should be hierarchical identifier");
        Statement::BlockingAssignment(lvalue, expr)
    }

    /// Nonblocking assignment.
    #[inline]
    pub fn nonblocking_assignment(lvalue: Expression, expr: Expression) -> Self {
        assert!(lvalue.is_lvalue(), "lvalue should be hierarchical identifier");
        Statement::NonblockingAssignment(lvalue, expr)
    }
}

fn gen_verilog_block(stmts: &[Statement]) -> String { indent(stmts.iter().map(|stmt| stmt.to_string()).join("\n"), INDENT) }

impl ToString for Statement {
    fn to_string(&self) -> String {
        match self {
            Self::BlockingAssignment(lvalue, expr) => {
                format!("{} = {};", lvalue.to_string(), expr.to_string())
            }
            Self::NonblockingAssignment(lvalue, expr) => {
                format!("{} <= {};", lvalue.to_string(), expr.to_string())
            }
            Self::Conditional(cond, then_stmt, else_stmt) if else_stmt.is_empty() => {
                format!("if ({}) begin\n{}\nend", cond.to_string(), gen_verilog_block(then_stmt))
            }
            Self::Conditional(cond, then_stmt, else_stmt) if then_stmt.is_empty() => {
                format!("if ({}) begin\nend else begin\n{}\nend", cond.to_string(), gen_verilog_block(else_stmt))
            }
            Self::Conditional(cond, then_stmt, else_stmt) => {
                format!(
                    "if ({}) begin\n{}\nend else begin\n{}\nend",
                    cond.to_string(),
                    gen_verilog_block(then_stmt),
                    gen_verilog_block(else_stmt),
                )
            }
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// And (bitwise)
    And,

    /// Eq (arithmetic, `a == b`)
    EqArithmetic,
}

impl ToString for BinaryOp {
    fn to_string(&self) -> String {
        match self {
            BinaryOp::And => "&",
            BinaryOp::EqArithmetic => "==",
        }
        .to_string()
    }
}

/// Expression.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Expression {
    /// Primary.
    Primary(Primary),

    /// Binary expression.
    Binary(Box<Expression>, BinaryOp, Box<Expression>),

    /// Conditional expression.
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

/// Primary.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Primary {
    /// Sized number literal.
    Number(LogicValues),

    /// Hierarchical identifier, optionally indexed: `ident[index]`.
    HierarchicalIdentifier(String, Option<Box<Expression>>),

    /// Mintypmax expression.
    MintypmaxExpression(Box<Expression>),
}

impl ToString for Expression {
    fn to_string(&self) -> String {
        match self {
            Self::Primary(prim) => prim.to_string(),
            Self::Binary(lhs, op, rhs) => format!("{} {} {}", lhs.to_string(), op.to_string(), rhs.to_string()),
            Self::Conditional(cond, then_expr, else_expr) => {
                format!("{} ? {} : {}", cond.to_string(), then_expr.to_string(), else_expr.to_string())
            }
        }
    }
}

impl From<String> for Expression {
    fn from(ident: String) -> Self { Expression::ident(ident) }
}

impl Expression {
    /// Number.
    pub fn number(bits: LogicValues) -> Self { Self::Primary(Primary::Number(bits)) }

    /// `width`-bit constant.
    pub fn constant(width: usize, value: u64) -> Self { Self::number(LogicValues::from_u64(width, value)) }

    /// `width`-bit don't-care.
    pub fn x(width: usize) -> Self { Self::number(LogicValues::x(width)) }

    /// Identifier.
    pub fn ident(ident: String) -> Self { Self::Primary(Primary::HierarchicalIdentifier(ident, None)) }

    /// Indexes an identifier: `self[index]`.
    pub fn with_index(self, index: Expression) -> Self {
        if let Expression::Primary(Primary::HierarchicalIdentifier(ident, None)) = self {
            Expression::Primary(Primary::HierarchicalIdentifier(ident, Some(Box::new(index))))
        } else {
            panic!("with_index: self is not an identifier")
        }
    }

    /// Mintypmax expression.
    pub fn mintypmax_expr(expr: Expression) -> Self { Self::Primary(Primary::MintypmaxExpression(Box::new(expr))) }

    /// Binary operation.
    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        // Operands of binary operation should be primary.
        Self::Binary(Box::new(lhs.into_primary()), op, Box::new(rhs.into_primary()))
    }

    /// Conditional expression.
    pub fn conditional(cond: Expression, then_expr: Expression, else_expr: Expression) -> Self {
        Self::Conditional(Box::new(cond), Box::new(then_expr), Box::new(else_expr))
    }

    /// Returns `true` if the expression is primary.
    pub fn is_primary(&self) -> bool { matches!(self, Self::Primary(_)) }

    /// Returns `true` if the expression can be assigned to.
    pub fn is_lvalue(&self) -> bool { matches!(self, Self::Primary(Primary::HierarchicalIdentifier(..))) }

    /// Returns the identifier if the expression is a plain identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Primary(Primary::HierarchicalIdentifier(ident, None)) => Some(ident),
            _ => None,
        }
    }

    /// Converts into primary.
    #[must_use]
    pub fn into_primary(self) -> Self {
        if self.is_primary() {
            self
        } else {
            Self::mintypmax_expr(self)
        }
    }

    /// Returns `true` if the expression is a `don't-care`.
    pub fn is_x(&self) -> bool { matches!(self, Expression::Primary(Primary::Number(n)) if n.is_x()) }
}

impl ToString for Primary {
    fn to_string(&self) -> String {
        match self {
            Self::Number(bits) if bits.is_x() => format!("{}'bx", bits.width()),
            Self::Number(bits) => format!("{}'b{}", bits.width(), bits.to_string()),
            Self::HierarchicalIdentifier(ident, Some(index)) => format!("{}[{}]", ident, index.to_string()),
            Self::HierarchicalIdentifier(ident, None) => ident.clone(),
            Self::MintypmaxExpression(expr) => format!("({})", expr.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_declaration() {
        assert_eq!(Declaration::array(8, 4, "Memory".to_string()).to_string(), "reg [8-1:0] Memory[4-1:0];");
        assert_eq!(Declaration::reg(1, "en_d0".to_string()).to_string(), "reg en_d0;");
        assert_eq!(Declaration::net(3, "w".to_string()).to_string(), "wire [3-1:0] w;");
    }

    #[test]
    fn binary_operands_are_parenthesized() {
        let en = Expression::ident("en".to_string());
        let mask = Expression::ident("mask".to_string());
        let mode = Expression::ident("mode".to_string());
        let cond = Expression::binary(BinaryOp::And, en, Expression::binary(BinaryOp::And, mask, mode));
        assert_eq!(cond.to_string(), "en & (mask & mode)");
    }

    #[test]
    fn literals() {
        assert_eq!(Expression::x(8).to_string(), "8'bx");
        assert_eq!(Expression::constant(4, 5).to_string(), "4'b0101");
        assert!(Expression::x(2).is_x());
        assert!(!Expression::constant(2, 0).is_x());
    }

    #[test]
    fn conditional_with_empty_then_branch() {
        let stmt = Statement::Conditional(
            Expression::ident("w".to_string()),
            vec![],
            vec![Statement::blocking_assignment(Expression::ident("r".to_string()), Expression::x(1))],
        );
        assert_eq!(stmt.to_string(), "if (w) begin\nend else begin\n    r = 1'bx;\nend");
    }
}
