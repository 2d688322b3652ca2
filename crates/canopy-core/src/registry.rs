//! Tree-wide registries
//!
//! Three flat singleton maps owned by the application root and reachable
//! from any node: custom error kinds (write-once, duplicates fail), shared
//! dependencies (first writer wins, duplicates are a logged no-op), and the
//! loaded-module set (see [`crate::module`]). Conflicting writers are
//! resolved by these fixed policies rather than locking.

use crate::error::{CompositionError, ErrorKind, RegisteredError};
use crate::events::Event;
use crate::namespace::Namespace;
use crate::util;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

impl Namespace {
    /// Register an error kind whose constructor takes a message.
    ///
    /// Fails if the name is already registered anywhere in the application.
    pub fn register_error(&self, name: &str) -> Result<&Self, CompositionError> {
        let name = util::member_name("register_error", Some(name), None)?;
        self.install_error_kind(ErrorKind::new(name))?;
        Ok(self)
    }

    /// Register an error kind with a custom initializer.
    ///
    /// The initializer receives the constructor's arguments and populates
    /// the message and any custom attributes.
    pub fn register_error_with<F>(&self, name: &str, init: F) -> Result<&Self, CompositionError>
    where
        F: Fn(&mut RegisteredError, &[Value]) + Send + Sync + 'static,
    {
        let name = util::member_name("register_error_with", Some(name), None)?;
        self.install_error_kind(ErrorKind::with_init(name, init))?;
        Ok(self)
    }

    fn install_error_kind(&self, kind: ErrorKind) -> Result<(), CompositionError> {
        let name = kind.name().to_string();
        self.app().install_error_kind(kind)?;
        self.app().emit(Event::ErrorRegistered { name });
        Ok(())
    }

    /// The constructor for a registered error kind, from any node.
    pub fn error_kind(&self, name: &str) -> Option<ErrorKind> {
        self.app().error_kind(name)
    }

    /// Construct an instance of a registered error kind.
    pub fn new_error(&self, name: &str, args: &[Value]) -> Option<RegisteredError> {
        self.error_kind(name).map(|kind| kind.construct(args))
    }

    /// Share a dependency under a name, tree-wide.
    ///
    /// The earliest registration always wins; a duplicate is a diagnostic
    /// notice, never an error, so independent modules may declare
    /// overlapping optional dependencies.
    pub fn share<T>(&self, name: &str, value: T) -> &Self
    where
        T: Any + Send + Sync,
    {
        if self.app().install_shared(name, Arc::new(value)) {
            self.app().emit(Event::DependencyShared {
                name: name.to_string(),
            });
        } else {
            tracing::info!(
                parent: self.root().span(),
                dependency = name,
                "dependency is already registered"
            );
            self.app().emit(Event::DependencyRejected {
                name: name.to_string(),
            });
        }
        self
    }

    /// Read a shared dependency, from any node.
    ///
    /// Returns `None` when the name is unknown or holds a different type.
    pub fn shared<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.app()
            .shared_any(name)
            .and_then(|value| value.downcast::<T>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Canopy;
    use crate::config::Config;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn app() -> Canopy {
        Canopy::new(Config::default())
    }

    #[test]
    fn registered_error_constructs_with_name_and_message() {
        let canopy = app();
        canopy.register_error("NotFound").expect("register");
        let err = canopy.new_error("NotFound", &[json!("missing")]).expect("kind exists");
        assert_eq!(err.name(), "NotFound");
        assert_eq!(err.message(), "missing");
    }

    #[test]
    fn duplicate_registration_fails() {
        let canopy = app();
        canopy.register_error("NotFound").expect("first");
        assert_matches!(
            canopy.register_error("NotFound"),
            Err(CompositionError::DuplicateErrorRegistration { name }) if name == "NotFound"
        );
    }

    #[test]
    fn error_kinds_are_reachable_from_any_node() {
        let canopy = app();
        let deep = canopy.namespace("a.b").expect("a.b");
        deep.register_error("Deep").expect("register from a node");
        assert!(canopy.error_kind("Deep").is_some());
        assert!(canopy.namespace("other").expect("other").error_kind("Deep").is_some());
    }

    #[test]
    fn initializer_registration_sets_custom_fields() {
        let canopy = app();
        canopy
            .register_error_with("DivideByZero", |err, args| {
                let number = args.first().cloned().unwrap_or(Value::Null);
                err.set_message(format!("cannot divide {number} by zero"));
                err.set_field("failing_number", number);
            })
            .expect("register");
        let err = canopy.new_error("DivideByZero", &[json!(5)]).expect("kind exists");
        assert_eq!(err.message(), "cannot divide 5 by zero");
        assert_eq!(err.field("failing_number"), Some(&json!(5)));
    }

    #[test]
    fn empty_error_name_is_invalid() {
        let canopy = app();
        assert_matches!(
            canopy.register_error(""),
            Err(CompositionError::InvalidArguments { .. })
        );
    }

    #[test]
    fn registration_is_chainable() {
        let canopy = app();
        canopy
            .register_error("Banana")
            .and_then(|ns| ns.register_error("BananaBanana"))
            .expect("chain");
        assert!(canopy.error_kind("Banana").is_some());
        assert!(canopy.error_kind("BananaBanana").is_some());
    }

    #[test]
    fn first_shared_writer_wins() {
        let canopy = app();
        canopy.share("answer", 41u32);
        canopy.share("answer", 42u32);
        let value = canopy.shared::<u32>("answer").expect("present");
        assert_eq!(*value, 41);
    }

    #[test]
    fn shared_dependencies_are_visible_from_any_node() {
        let canopy = app();
        let node = canopy.namespace("db").expect("db");
        node.share("pool_size", 16usize);
        let other = canopy.namespace("web").expect("web");
        assert_eq!(other.shared::<usize>("pool_size").as_deref(), Some(&16));
    }

    #[test]
    fn shared_read_with_wrong_type_is_none() {
        let canopy = app();
        canopy.share("answer", 42u32);
        assert!(canopy.shared::<String>("answer").is_none());
        assert!(canopy.shared::<u32>("unknown").is_none());
    }

    #[test]
    fn share_accepts_callables() {
        let canopy = app();
        canopy.share("greet", Box::new(|name: &str| format!("hi {name}")) as Box<dyn Fn(&str) -> String + Send + Sync>);
        let greet = canopy
            .shared::<Box<dyn Fn(&str) -> String + Send + Sync>>("greet")
            .expect("present");
        assert_eq!((*greet)("dev"), "hi dev");
    }
}
