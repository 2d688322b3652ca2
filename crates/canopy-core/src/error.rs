//! Unified error handling for the composition core
//!
//! Two families: [`CompositionError`] for synchronous registration/setup
//! misuse (programmer errors, expected to propagate to startup), and
//! [`InvokeError`] for failures surfaced through an action's or method's
//! asynchronous result. Application-defined error kinds registered through
//! the error-kind registry materialize as [`RegisteredError`] values and
//! flow into `InvokeError` via `From`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Synchronous setup error raised at the point of misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    /// Wrong runtime kind passed to a validated parameter
    #[error("{caller}() called with invalid arguments: {arg} should be a {expected}")]
    InvalidArguments {
        /// Name of the method that was called
        caller: String,
        /// Name of the offending argument
        arg: String,
        /// Allowed kind(s), joined with `/`
        expected: String,
    },

    /// Path fails the `identifier(.identifier)*` grammar
    #[error("invalid namespace name '{path}'")]
    InvalidNamespaceName {
        /// The rejected path
        path: String,
    },

    /// Name collides with an existing non-namespace member on the same node
    #[error("cannot create '{name}' on '{path}': the name is already taken")]
    IllegalNamespace {
        /// Path of the node the creation was attempted on
        path: String,
        /// The conflicting local name
        name: String,
    },

    /// `extend` targeted a method with no default implementation
    #[error("cannot extend '{method}': no default implementation exists")]
    UnexpectedExtension {
        /// The unknown method name
        method: String,
    },

    /// `register_error` targeted a name that is already registered
    #[error("error kind '{name}' is already registered")]
    DuplicateErrorRegistration {
        /// The duplicate error-kind name
        name: String,
    },
}

impl CompositionError {
    /// Create an invalid-arguments error
    pub fn invalid_arguments(
        caller: impl Into<String>,
        arg: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidArguments {
            caller: caller.into(),
            arg: arg.into(),
            expected: expected.into(),
        }
    }

    /// Create an illegal-namespace error
    pub fn illegal_namespace(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::IllegalNamespace {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Failure surfaced through an asynchronous action or method result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// No action exists at the invoked path
    #[error("no action at '{path}'")]
    ActionNotFound {
        /// The path the caller used
        path: String,
    },

    /// No method resolves for the invoked name
    #[error("no method '{method}' is visible from this namespace")]
    MethodNotFound {
        /// The invoked method name
        method: String,
    },

    /// An extension called super, but no previous implementation exists
    #[error("method '{method}' has no previous implementation")]
    NoSuper {
        /// The extended method name
        method: String,
    },

    /// An application-registered error kind
    #[error(transparent)]
    Registered(#[from] RegisteredError),

    /// Generic handler failure
    #[error("{message}")]
    Failure {
        /// Error message produced by the handler
        message: String,
    },
}

impl InvokeError {
    /// Create a generic handler failure
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// A validation failure inside a handler body is a handler failure: it is
/// captured into the asynchronous result instead of unwinding.
impl From<CompositionError> for InvokeError {
    fn from(err: CompositionError) -> Self {
        Self::Failure {
            message: err.to_string(),
        }
    }
}

/// An instance of an application-registered error kind.
///
/// Carries the registered kind name, a message, and any custom attributes
/// populated by the kind's initializer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredError {
    name: String,
    message: String,
    fields: HashMap<String, Value>,
}

impl RegisteredError {
    /// The registered kind name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Replace the error message (initializer API)
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Read a custom attribute set by the kind's initializer
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a custom attribute (initializer API)
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

impl std::fmt::Display for RegisteredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for RegisteredError {}

/// Initializer run by an error-kind constructor over the caller's arguments.
pub type ErrorInit = dyn Fn(&mut RegisteredError, &[Value]) + Send + Sync;

/// Constructor for an application-registered error kind.
///
/// With no initializer, the first constructor argument becomes the message.
/// With one, the initializer receives all arguments and populates message
/// and custom attributes itself.
#[derive(Clone)]
pub struct ErrorKind {
    name: String,
    init: Option<Arc<ErrorInit>>,
}

impl ErrorKind {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            init: None,
        }
    }

    pub(crate) fn with_init<F>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn(&mut RegisteredError, &[Value]) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            init: Some(Arc::new(init)),
        }
    }

    /// The registered kind name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct an error instance from the caller's arguments.
    pub fn construct(&self, args: &[Value]) -> RegisteredError {
        let mut error = RegisteredError {
            name: self.name.clone(),
            message: String::new(),
            fields: HashMap::new(),
        };
        match &self.init {
            Some(init) => (**init)(&mut error, args),
            None => {
                error.message = match args.first() {
                    Some(Value::String(message)) => message.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
            }
        }
        error
    }

    /// Construct an error instance carrying just a message.
    pub fn with_message(&self, message: impl Into<String>) -> RegisteredError {
        self.construct(&[Value::String(message.into())])
    }
}

impl std::fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorKind")
            .field("name", &self.name)
            .field("init", &self.init.as_ref().map(|_| "custom"))
            .finish()
    }
}
