//! Canopy Testing Infrastructure
//!
//! Common test setup to eliminate duplication across test modules:
//! application builders, an event probe, counting modules, and tracing
//! initialization.
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! canopy-testkit = { path = "../canopy-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use canopy_core::{Canopy, Config, Event, Module};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Install a test tracing subscriber honoring the config's log level.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing(config: &Config) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(config.log.level.clone())
        .with_test_writer()
        .try_init();
}

/// A fresh application with default configuration.
pub fn test_app() -> Canopy {
    Canopy::new(test_config())
}

/// A fresh application with a custom root name.
pub fn test_app_named(name: &str) -> Canopy {
    Canopy::new(Config::named(name))
}

/// Default test configuration.
pub fn test_config() -> Config {
    Config::default()
}

/// Collects lifecycle events emitted since the probe was attached.
pub struct EventProbe {
    receiver: broadcast::Receiver<Event>,
}

impl EventProbe {
    /// Attach to an application's event channel.
    pub fn attach(canopy: &Canopy) -> Self {
        Self {
            receiver: canopy.subscribe(),
        }
    }

    /// Drain every event emitted so far.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// A named module that counts how many times its body ran.
pub fn counting_module(name: &str) -> (Module, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let module = Module::named(name, move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (module, count)
}

/// An anonymous module that counts how many times its body ran.
pub fn counting_anonymous_module() -> (Module, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let module = Module::anonymous(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (module, count)
}
