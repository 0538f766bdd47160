//! Design: the collection of schemas and modules a pass runs over.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use linked_hash_map::LinkedHashMap;
use static_assertions::assert_impl_all;
use thiserror::Error;

use super::*;
use crate::memgen::LowerError;
use crate::vir;

#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("file system error: {error:?}")]
    Fs { error: io::Error },

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("module `{module}` refers to unknown generator `{generator}`")]
    UnknownGenerator { module: String, generator: String },

    #[error("module `{0}` is already defined")]
    DuplicateModule(String),

    #[error("generator schema `{0}` is already defined")]
    DuplicateSchema(String),

    #[error("failed to lower module `{module}`: {error}")]
    Lower { module: String, error: LowerError },
}

/// Design.
#[derive(Debug, Default, Clone)]
pub struct Design {
    schemas: LinkedHashMap<String, GeneratorSchema>,
    modules: LinkedHashMap<String, ModuleOp>,
}

assert_impl_all!(Design: Send, Sync);

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self { Self::default() }

    /// Adds a generator schema.
    pub fn add_schema(&mut self, schema: GeneratorSchema) -> Result<(), DesignError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(DesignError::DuplicateSchema(schema.name));
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Adds a module at the end of the design.
    pub fn add_module<M: Into<ModuleOp>>(&mut self, module: M) -> Result<(), DesignError> {
        let module = module.into();
        if self.modules.contains_key(module.name()) {
            return Err(DesignError::DuplicateModule(module.name().to_string()));
        }
        self.modules.insert(module.name().to_string(), module);
        Ok(())
    }

    /// Looks up a module by name.
    pub fn module(&self, name: &str) -> Option<&ModuleOp> { self.modules.get(name) }

    /// Looks up a generator schema by name.
    pub fn schema(&self, name: &str) -> Option<&GeneratorSchema> { self.schemas.get(name) }

    /// Modules, in design order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleOp> { self.modules.values() }

    /// Generated modules, in design order.
    pub fn generated_modules(&self) -> impl Iterator<Item = &GeneratedModule> {
        self.modules.values().filter_map(|module| match module {
            ModuleOp::Generated(module) => Some(module),
            ModuleOp::Concrete(_) => None,
        })
    }

    /// Returns the schema the generated module refers to.
    pub fn generator_of(&self, module: &GeneratedModule) -> Result<&GeneratorSchema, DesignError> {
        self.schemas.get(&module.generator).ok_or_else(|| DesignError::UnknownGenerator {
            module: module.name.clone(),
            generator: module.generator.clone(),
        })
    }

    /// Removes the module `name` and appends `module` in its place at the end of the design.
    ///
    /// Returns the removed module.
    pub fn replace_module<M: Into<ModuleOp>>(&mut self, name: &str, module: M) -> Result<ModuleOp, DesignError> {
        let module = module.into();
        let old = self.modules.remove(name).ok_or_else(|| DesignError::UnknownModule(name.to_string()))?;
        if self.modules.contains_key(module.name()) {
            let name = module.name().to_string();
            self.modules.insert(old.name().to_string(), old);
            return Err(DesignError::DuplicateModule(name));
        }
        self.modules.insert(module.name().to_string(), module);
        Ok(old)
    }

    /// Removes the module `name`.
    pub fn remove_module(&mut self, name: &str) -> Result<ModuleOp, DesignError> {
        self.modules.remove(name).ok_or_else(|| DesignError::UnknownModule(name.to_string()))
    }

    fn gen_vir_module<P: AsRef<Path>>(&self, module: &vir::Module, path_dir: P) -> Result<(), DesignError> {
        let path = path_dir.as_ref().join(format!("{}.v", module.name));
        let mut file = File::create(path).map_err(|error| DesignError::Fs { error })?;

        writeln!(file, "{}", module.to_string()).map_err(|error| DesignError::Fs { error })?;

        Ok(())
    }

    /// Generates Verilog code of every concrete module at the given directory path.
    ///
    /// Generated modules have no body and are skipped.
    pub fn gen_vir<P: AsRef<Path>>(&self, path_dir: P) -> Result<(), DesignError> {
        fs::create_dir_all(path_dir.as_ref()).map_err(|error| DesignError::Fs { error })?;

        for module in self.modules.values() {
            match module {
                ModuleOp::Concrete(module) => self.gen_vir_module(module, &path_dir)?,
                ModuleOp::Generated(module) => log::debug!("skipping generated module `{}`", module.name),
            }
        }

        Ok(())
    }
}
