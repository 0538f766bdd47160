//! Modules of the host design.

use linked_hash_map::LinkedHashMap;

use crate::vir;

/// Attribute value of a generated module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Integer attribute.
    Int(i64),

    /// String attribute.
    Str(String),
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self { Attribute::Int(value) }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self { Attribute::Str(value.to_string()) }
}

/// Schema shared by all modules produced by one generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSchema {
    /// Schema name, referred to by generated modules.
    pub name: String,

    /// Descriptor tag identifying what the generator describes, e.g. `FIRRTL_Memory`.
    pub descriptor: String,

    /// Attributes every generated module of this schema carries.
    pub required_attrs: Vec<String>,
}

impl GeneratorSchema {
    /// Creates new schema.
    pub fn new(name: &str, descriptor: &str, required_attrs: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            required_attrs: required_attrs.iter().map(|attr| attr.to_string()).collect(),
        }
    }
}

/// Declarative module: a port signature plus generator parameters, with no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    /// Module name.
    pub name: String,

    /// Port declarations. Inputs and outputs each keep their relative order.
    pub port_decls: Vec<vir::PortDeclaration>,

    /// Name of the generator schema.
    pub generator: String,

    /// Generator parameters, in declaration order.
    pub attrs: LinkedHashMap<String, Attribute>,
}

impl GeneratedModule {
    /// Creates new generated module without attributes.
    pub fn new(name: &str, generator: &str, port_decls: Vec<vir::PortDeclaration>) -> Self {
        Self { name: name.to_string(), port_decls, generator: generator.to_string(), attrs: LinkedHashMap::new() }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attr<A: Into<Attribute>>(mut self, name: &str, value: A) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }
}

/// Module of a design.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOp {
    /// Declarative module awaiting lowering.
    Generated(GeneratedModule),

    /// Module with a concrete body.
    Concrete(vir::Module),
}

impl ModuleOp {
    /// Returns module name.
    pub fn name(&self) -> &str {
        match self {
            ModuleOp::Generated(module) => &module.name,
            ModuleOp::Concrete(module) => &module.name,
        }
    }

    /// Returns port declarations.
    pub fn port_decls(&self) -> &[vir::PortDeclaration] {
        match self {
            ModuleOp::Generated(module) => &module.port_decls,
            ModuleOp::Concrete(module) => &module.port_decls,
        }
    }
}

impl From<GeneratedModule> for ModuleOp {
    fn from(module: GeneratedModule) -> Self { ModuleOp::Generated(module) }
}

impl From<vir::Module> for ModuleOp {
    fn from(module: vir::Module) -> Self { ModuleOp::Concrete(module) }
}
