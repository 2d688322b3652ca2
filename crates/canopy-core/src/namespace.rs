//! Namespace tree with delegated member lookup
//!
//! Every node is identified by a dotted path and owns a single members map
//! shared between child namespaces, actions, and attached data. A lookup
//! that misses on a node is retried on its parent, walking to the root,
//! which is how a node inherits all capabilities of its ancestors without
//! copying them. Structural mutation is synchronous: a registration call
//! takes full effect before it returns.
//!
//! Resolution of a dotted path treats the first segment specially: it is
//! searched through the delegation chain (so a namespace created near the
//! root can be reused from anywhere), while every subsequent segment must
//! resolve to a direct child of the node reached so far. The asymmetry
//! keeps an action registered on one branch from leaking into an unrelated
//! branch that happens to share a local name.

use crate::action::Action;
use crate::app::AppCore;
use crate::config::Config;
use crate::error::CompositionError;
use crate::method::Method;
use crate::util;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::Span;

/// A member stored in a node's own-members map.
///
/// A local name holds exactly one member; creating a namespace or action
/// over a name of a different kind signals a naming conflict.
#[derive(Debug, Clone)]
pub enum Member {
    /// A child namespace
    Namespace(Namespace),
    /// A registered action
    Action(Action),
    /// Arbitrary data attached by a module
    Value(Value),
}

impl Member {
    /// The namespace, if this member is one.
    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Self::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// The action, if this member is one.
    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Self::Action(action) => Some(action),
            _ => None,
        }
    }

    /// The attached value, if this member is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

pub(crate) struct NodeInner {
    pub(crate) path: String,
    pub(crate) parent: Weak<NodeInner>,
    pub(crate) app: Arc<AppCore>,
    pub(crate) members: RwLock<HashMap<String, Member>>,
    pub(crate) methods: RwLock<HashMap<String, Arc<Method>>>,
    pub(crate) span: Span,
}

/// Handle to a namespace node. Cheap to clone; clones refer to the same node.
#[derive(Clone)]
pub struct Namespace {
    pub(crate) inner: Arc<NodeInner>,
}

impl Namespace {
    pub(crate) fn new_root(app: Arc<AppCore>, name: &str) -> Self {
        let span = tracing::info_span!("namespace", path = %name);
        Self {
            inner: Arc::new(NodeInner {
                path: name.to_string(),
                parent: Weak::new(),
                app,
                members: RwLock::new(HashMap::new()),
                methods: RwLock::new(HashMap::new()),
                span,
            }),
        }
    }

    /// Dotted path of this node, rendered under the application root name.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Parent node; `None` on the root.
    pub fn parent(&self) -> Option<Namespace> {
        self.inner.parent.upgrade().map(|inner| Namespace { inner })
    }

    /// The root node of this tree.
    pub fn root(&self) -> Namespace {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Application configuration, as passed to the constructor.
    pub fn config(&self) -> &Config {
        self.inner.app.config()
    }

    /// The tracing span scoped to this node's path.
    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    pub(crate) fn app(&self) -> &Arc<AppCore> {
        &self.inner.app
    }

    /// Whether two handles refer to the same node.
    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &Namespace) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Delegated member lookup: this node's own members first, then each
    /// ancestor in turn. Returns `None` once the root misses.
    pub fn lookup(&self, name: &str) -> Option<Member> {
        if let Some(member) = self.own_member(name) {
            return Some(member);
        }
        self.parent().and_then(|parent| parent.lookup(name))
    }

    /// Member stored directly on this node, without delegation.
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.inner.members.read().get(name).cloned()
    }

    /// Resolve a dotted path to its unique node, creating missing nodes.
    ///
    /// The empty path returns this node. Repeated resolution of the same
    /// path yields the identical node.
    pub fn namespace(&self, path: &str) -> Result<Namespace, CompositionError> {
        if path.is_empty() {
            return Ok(self.clone());
        }
        util::validate_namespace_name(path)?;
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Ok(self.clone());
        };
        // The head segment is searched through the delegation chain; it is
        // not always a child of this node.
        let mut current = match self.get_namespace(first) {
            Some(ns) => ns,
            None => self.create_namespace(first)?,
        };
        // Every remaining segment descends strictly, child by child.
        for segment in segments {
            current = match current.get_child_namespace(segment) {
                Some(ns) => ns,
                None => current.create_namespace(segment)?,
            };
        }
        Ok(current)
    }

    /// Namespace visible from this node under a single name, by delegation.
    fn get_namespace(&self, name: &str) -> Option<Namespace> {
        match self.lookup(name) {
            Some(Member::Namespace(ns)) => Some(ns),
            _ => None,
        }
    }

    /// Namespace stored directly on this node under a single name.
    fn get_child_namespace(&self, name: &str) -> Option<Namespace> {
        match self.own_member(name) {
            Some(Member::Namespace(ns)) => Some(ns),
            _ => None,
        }
    }

    /// Create a child node under `name`.
    ///
    /// Signals an illegal-namespace conflict if the name is already taken
    /// by any member of this node.
    pub(crate) fn create_namespace(&self, name: &str) -> Result<Namespace, CompositionError> {
        let mut members = self.inner.members.write();
        if members.contains_key(name) {
            return Err(CompositionError::illegal_namespace(self.path(), name));
        }
        let path = format!("{}.{}", self.inner.path, name);
        let span = tracing::info_span!(parent: &self.inner.span, "namespace", path = %path);
        let child = Namespace {
            inner: Arc::new(NodeInner {
                path,
                parent: Arc::downgrade(&self.inner),
                app: Arc::clone(&self.inner.app),
                members: RwLock::new(HashMap::new()),
                methods: RwLock::new(HashMap::new()),
                span,
            }),
        };
        members.insert(name.to_string(), Member::Namespace(child.clone()));
        Ok(child)
    }

    /// Attach arbitrary data to this node.
    ///
    /// Attached values may be replaced freely; namespaces and actions are
    /// protected and collide instead.
    pub fn attach(&self, name: &str, value: Value) -> Result<&Self, CompositionError> {
        let mut members = self.inner.members.write();
        match members.get(name) {
            Some(Member::Namespace(_)) | Some(Member::Action(_)) => {
                Err(CompositionError::illegal_namespace(self.path(), name))
            }
            _ => {
                members.insert(name.to_string(), Member::Value(value));
                Ok(self)
            }
        }
    }

    /// Read attached data visible from this node, by delegation.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.lookup(name) {
            Some(Member::Value(value)) => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("path", &self.inner.path)
            .field("members", &self.inner.members.read().len())
            .finish()
    }
}
