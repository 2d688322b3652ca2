//! Method extension registry
//!
//! Default methods live in a root-owned table; any node may replace one
//! locally with [`Namespace::extend`]. A replacement is a decorator layer
//! that captures whatever implementation was visible from the node at the
//! moment of extension, so [`MethodCall::call_super`] composes instead of
//! clobbering. Descendants see the replacement by delegation; ancestors
//! and sibling subtrees never do.

use crate::error::{CompositionError, InvokeError};
use crate::namespace::Namespace;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

type MethodFn = dyn Fn(MethodCall) -> BoxFuture<'static, Result<Value, InvokeError>> + Send + Sync;

/// One layer of a method: an implementation plus the implementation it
/// replaced. Chains are linear per node.
pub struct Method {
    name: String,
    func: Arc<MethodFn>,
    super_method: Option<Arc<Method>>,
}

impl Method {
    pub(crate) fn layer<F, Fut>(name: &str, f: F, super_method: Option<Arc<Method>>) -> Arc<Self>
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            func: Arc::new(move |call| f(call).boxed()),
            super_method,
        })
    }

    /// The method name this layer implements.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(
        self: &Arc<Self>,
        context: Namespace,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value, InvokeError>> {
        (*self.func)(MethodCall {
            context,
            args,
            method: Arc::clone(self),
        })
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("layers", &self.depth())
            .finish()
    }
}

impl Method {
    fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.super_method.as_deref();
        while let Some(method) = current {
            depth += 1;
            current = method.super_method.as_deref();
        }
        depth
    }
}

/// One invocation of a method, handed to its implementation.
pub struct MethodCall {
    context: Namespace,
    args: Vec<Value>,
    method: Arc<Method>,
}

impl MethodCall {
    /// The namespace the method was invoked on.
    pub fn context(&self) -> &Namespace {
        &self.context
    }

    /// All arguments of this invocation.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// A single argument by position.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Invoke the implementation that was visible immediately before this
    /// layer was installed, bound to the same namespace context.
    pub fn call_super(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value, InvokeError>> {
        match &self.method.super_method {
            Some(previous) => previous.dispatch(self.context.clone(), args),
            None => future::ready(Err(InvokeError::NoSuper {
                method: self.method.name.clone(),
            }))
            .boxed(),
        }
    }
}

impl std::fmt::Debug for MethodCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodCall")
            .field("method", &self.method.name)
            .field("path", &self.context.path())
            .finish()
    }
}

impl Namespace {
    /// Replace `method` on this node, keeping the previous implementation
    /// reachable through [`MethodCall::call_super`].
    ///
    /// The method must have a default implementation (see
    /// [`crate::Canopy::define_default`]); extending an unknown name is a
    /// programmer error.
    pub fn extend<F, Fut>(&self, method: &str, replacement: F) -> Result<&Self, CompositionError>
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
    {
        if !self.app().has_default(method) {
            return Err(CompositionError::UnexpectedExtension {
                method: method.to_string(),
            });
        }
        // The value visible from this node right now becomes the new
        // layer's super, whether it is an own layer, an inherited one, or
        // the root default.
        let current = self.resolve_method(method);
        let layer = Method::layer(method, replacement, current);
        self.inner.methods.write().insert(method.to_string(), layer);
        Ok(self)
    }

    /// Invoke the topmost implementation of `method` visible from this
    /// node, with this node as the call context.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value, InvokeError>> {
        match self.resolve_method(method) {
            Some(layer) => layer.dispatch(self.clone(), args),
            None => future::ready(Err(InvokeError::MethodNotFound {
                method: method.to_string(),
            }))
            .boxed(),
        }
    }

    /// Walk this node and its ancestors for an own layer, falling back to
    /// the root defaults table.
    pub(crate) fn resolve_method(&self, method: &str) -> Option<Arc<Method>> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if let Some(layer) = node.inner.methods.read().get(method) {
                return Some(Arc::clone(layer));
            }
            current = node.parent();
        }
        self.app().default_method(method)
    }
}
