//! Lifecycle events emitted by the application root

/// A registration-lifecycle event, observable via [`crate::Canopy::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A module's setup body ran
    ModuleLoaded {
        /// Module name, if any (anonymous modules carry none)
        name: Option<String>,
    },
    /// An action was registered
    ActionRegistered {
        /// Full path of the action's execution context
        path: String,
    },
    /// An action registration replaced a previous one at the same path
    ActionOverwritten {
        /// Full path of the replaced action
        path: String,
    },
    /// An error kind was registered
    ErrorRegistered {
        /// The error-kind name
        name: String,
    },
    /// A shared dependency was installed
    DependencyShared {
        /// The dependency name
        name: String,
    },
    /// A shared dependency was rejected because the name was taken
    DependencyRejected {
        /// The dependency name
        name: String,
    },
}
