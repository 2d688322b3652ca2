//! Module loading
//!
//! A module is a unit of setup code invoked against a namespace with the
//! application configuration. Named modules load at most once per
//! application; anonymous modules load every time.

use crate::config::Config;
use crate::error::CompositionError;
use crate::events::Event;
use crate::namespace::Namespace;
use std::sync::Arc;

type SetupFn = dyn Fn(&Namespace, &Config) -> Result<(), CompositionError> + Send + Sync;

/// A loadable unit of setup code.
#[derive(Clone)]
pub struct Module {
    name: Option<String>,
    setup: Arc<SetupFn>,
}

impl Module {
    /// A named module; loading it twice runs the body once.
    ///
    /// An empty name degrades to anonymous.
    pub fn named<F>(name: impl Into<String>, setup: F) -> Self
    where
        F: Fn(&Namespace, &Config) -> Result<(), CompositionError> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            name: (!name.is_empty()).then_some(name),
            setup: Arc::new(setup),
        }
    }

    /// An anonymous module; never deduplicated.
    pub fn anonymous<F>(setup: F) -> Self
    where
        F: Fn(&Namespace, &Config) -> Result<(), CompositionError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            setup: Arc::new(setup),
        }
    }

    /// The module's declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish()
    }
}

impl Namespace {
    /// Load a module against this node.
    ///
    /// The setup body receives this node and the application
    /// configuration. A named module already loaded anywhere in the
    /// application is skipped; the name is recorded before the body runs,
    /// so a module that loads itself recursively runs once.
    pub fn load_module(&self, module: &Module) -> Result<&Self, CompositionError> {
        if let Some(name) = module.name() {
            if !self.app().record_module(name) {
                tracing::info!(parent: self.span(), module = name, "module already loaded");
                return Ok(self);
            }
            tracing::info!(parent: self.span(), module = name, "loading module");
        }
        (*module.setup)(self, self.config())?;
        self.app().emit(Event::ModuleLoaded {
            name: module.name().map(str::to_string),
        });
        Ok(self)
    }
}
