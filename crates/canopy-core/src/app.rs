//! Application root
//!
//! [`Canopy`] owns the root namespace node and, through it, the whole tree.
//! The root-owned singletons (loaded-module set, shared dependencies, error
//! kinds, default methods, the event channel) live in an [`AppCore`] that
//! every node holds a handle to; the core never references nodes back, so
//! the tree stays cycle-free. Keep the `Canopy` alive for the lifetime of
//! the application: nodes are owned top-down through their parents' member
//! maps.

use crate::config::Config;
use crate::error::{CompositionError, ErrorKind};
use crate::events::Event;
use crate::method::{Method, MethodCall};
use crate::namespace::Namespace;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub(crate) struct AppCore {
    config: Config,
    loaded_modules: RwLock<HashSet<String>>,
    shared: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    error_kinds: RwLock<HashMap<String, ErrorKind>>,
    defaults: RwLock<HashMap<String, Arc<Method>>>,
    events: broadcast::Sender<Event>,
}

impl AppCore {
    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn emit(&self, event: Event) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Record a module name; returns false if it was already present.
    pub(crate) fn record_module(&self, name: &str) -> bool {
        self.loaded_modules.write().insert(name.to_string())
    }

    pub(crate) fn install_error_kind(&self, kind: ErrorKind) -> Result<(), CompositionError> {
        let mut kinds = self.error_kinds.write();
        if kinds.contains_key(kind.name()) {
            return Err(CompositionError::DuplicateErrorRegistration {
                name: kind.name().to_string(),
            });
        }
        kinds.insert(kind.name().to_string(), kind);
        Ok(())
    }

    pub(crate) fn error_kind(&self, name: &str) -> Option<ErrorKind> {
        self.error_kinds.read().get(name).cloned()
    }

    /// First writer wins; returns false when the name was taken.
    pub(crate) fn install_shared(&self, name: &str, value: Arc<dyn Any + Send + Sync>) -> bool {
        let mut shared = self.shared.write();
        if shared.contains_key(name) {
            return false;
        }
        shared.insert(name.to_string(), value);
        true
    }

    pub(crate) fn shared_any(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.shared.read().get(name).cloned()
    }

    pub(crate) fn has_default(&self, name: &str) -> bool {
        self.defaults.read().contains_key(name)
    }

    pub(crate) fn default_method(&self, name: &str) -> Option<Arc<Method>> {
        self.defaults.read().get(name).cloned()
    }

    fn set_default(&self, name: &str, method: Arc<Method>) {
        self.defaults.write().insert(name.to_string(), method);
    }
}

/// The application root.
pub struct Canopy {
    root: Namespace,
}

impl Canopy {
    /// Build an application root from a configuration object.
    pub fn new(config: Config) -> Self {
        let name = config.name.clone();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let app = Arc::new(AppCore {
            config,
            loaded_modules: RwLock::new(HashSet::new()),
            shared: RwLock::new(HashMap::new()),
            error_kinds: RwLock::new(HashMap::new()),
            defaults: RwLock::new(HashMap::new()),
            events,
        });
        let canopy = Self {
            root: Namespace::new_root(app, &name),
        };
        canopy.install_builtin_defaults();
        canopy
    }

    /// The root namespace node.
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Install a default method, the implementation every node sees until
    /// it (or an ancestor) extends it.
    pub fn define_default<F, Fut>(&self, name: &str, implementation: F) -> &Self
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, crate::error::InvokeError>> + Send + 'static,
    {
        let method = Method::layer(name, implementation, None);
        self.root.app().set_default(name, method);
        self
    }

    /// Observe registration-lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.root.app().events.subscribe()
    }

    fn install_builtin_defaults(&self) {
        self.define_default("log", |call: MethodCall| async move {
            let message = call
                .args()
                .iter()
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(parent: call.context().span(), "{message}");
            Ok(Value::Null)
        });
    }
}

impl Default for Canopy {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::ops::Deref for Canopy {
    type Target = Namespace;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

impl std::fmt::Debug for Canopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canopy")
            .field("root", &self.root)
            .finish()
    }
}
