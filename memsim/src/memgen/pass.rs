//! Pass driver.

use std::fmt;

use static_assertions::assert_impl_all;

use super::*;
use crate::hw::{Design, DesignError, GeneratedModule};
use crate::vir::{self, Context};

type Filter = Box<dyn Fn(&GeneratedModule) -> bool + Send + Sync>;

/// Lowers every memory of a design.
///
/// A generated module is lowered if its generator schema carries the configured descriptor tag and the
/// filter, if any, accepts it.
#[derive(Default)]
pub struct MemSimPass {
    options: MemSimOptions,
    filter: Option<Filter>,
}

assert_impl_all!(MemSimPass: Send, Sync);

impl fmt::Debug for MemSimPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemSimPass").field("options", &self.options).field("filter", &self.filter.is_some()).finish()
    }
}

impl MemSimPass {
    /// Creates new pass.
    pub fn new(options: MemSimOptions) -> Self { Self { options, filter: None } }

    /// Restricts the pass to generated modules accepted by `filter`.
    #[must_use]
    pub fn with_filter<F>(self, filter: F) -> Self
    where F: Fn(&GeneratedModule) -> bool + Send + Sync + 'static {
        Self { filter: Some(Box::new(filter)), ..self }
    }

    /// Returns the options.
    pub fn options(&self) -> &MemSimOptions { &self.options }

    fn lower(&self, design: &Design, module: &GeneratedModule) -> Result<Option<vir::Module>, DesignError> {
        let schema = design.generator_of(module)?;
        if schema.descriptor != self.options.descriptor_tag {
            log::debug!("skipping `{}`: generator `{}` is tagged `{}`", module.name, schema.name, schema.descriptor);
            return Ok(None);
        }
        if let Some(filter) = &self.filter {
            if !filter(module) {
                log::debug!("skipping `{}`: rejected by filter", module.name);
                return Ok(None);
            }
        }

        let lower_error = |error| DesignError::Lower { module: module.name.clone(), error };
        let descriptor = MemoryDescriptor::from_attributes(&module.name, &module.attrs).map_err(lower_error)?;
        let lowered = lower_memory(&Context::new(), &module.name, module.port_decls.clone(), &descriptor, &self.options)
            .map_err(lower_error)?;
        Ok(Some(lowered))
    }

    /// Runs the pass. Returns the names of the lowered modules, in design order.
    ///
    /// Lowering is all-or-nothing: if any memory fails to lower, the design is left untouched.
    pub fn run(&self, design: &mut Design) -> Result<Vec<String>, DesignError> {
        let mut lowered = Vec::new();
        for module in design.generated_modules() {
            if let Some(module) = self.lower(design, module)? {
                lowered.push(module);
            }
        }

        let mut names = Vec::with_capacity(lowered.len());
        for module in lowered {
            let name = module.name.clone();
            let _ = design.replace_module(&name, module)?;
            names.push(name);
        }
        Ok(names)
    }
}
