//! Canopy Core - Hierarchical Module Composition
//!
//! A process-local composition mechanism for independently-developed
//! modules: register named asynchronous operations ("actions") under dotted
//! paths, share a single dependency-resolution registry, declare custom
//! error kinds exactly once, and override default behaviors while keeping
//! the overridden implementation reachable.
//!
//! # Architecture
//!
//! - [`Canopy`]: the application root; owns the namespace tree and the
//!   tree-wide singleton registries.
//! - [`Namespace`]: a tree node identified by a dotted path; member lookups
//!   that miss on a node are retried on its parent, walking to the root.
//! - [`Action`] / [`ActionHandler`]: named asynchronous operations bound to
//!   a dedicated execution-context node.
//! - [`Namespace::extend`] / [`MethodCall`]: node-local method replacement
//!   layered over root-owned defaults.
//! - [`Module`]: units of setup code, loaded at most once per name.
//!
//! # Example
//!
//! ```rust
//! use canopy_core::{ActionHandler, Canopy, Config, json, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let canopy = Canopy::new(Config::default());
//! canopy.define_action(
//!     "math.square",
//!     ActionHandler::sync(|call| {
//!         let n = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
//!         Ok(json!(n * n))
//!     }),
//! )?;
//! let squared = canopy.namespace("math")?.call("square", vec![json!(4)]).await?;
//! assert_eq!(squared, json!(16));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod action;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod method;
pub mod module;
pub mod namespace;
pub mod registry;
pub mod util;

pub use action::{Action, ActionCall, ActionHandler, SequenceStep};
pub use app::Canopy;
pub use config::{Config, LogConfig};
pub use error::{CompositionError, ErrorKind, InvokeError, RegisteredError};
pub use events::Event;
pub use method::{Method, MethodCall};
pub use module::Module;
pub use namespace::{Member, Namespace};
pub use util::ValueKind;

// The value and future currency of the crate, re-exported for consumers.
pub use futures::future::BoxFuture;
pub use serde_json::{json, Value};
