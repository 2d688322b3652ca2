//! Action registration and execution
//!
//! An action is a named asynchronous operation bound to a dedicated
//! namespace node that serves as its execution context. The context is a
//! child of the hosting node, so a handler reaches every ancestor
//! capability through delegation, and [`ActionCall::execute`] lets it
//! invoke itself recursively.
//!
//! Handlers carry an explicit kind tag instead of being inspected at
//! runtime: a plain closure, an async closure, or a sequence of suspending
//! steps driven to completion by a sequential driver that feeds each step
//! the previous step's result and stops at the first failure.

use crate::error::{CompositionError, InvokeError};
use crate::events::Event;
use crate::namespace::{Member, Namespace};
use crate::util;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

type SyncFn = dyn Fn(&ActionCall) -> Result<Value, InvokeError> + Send + Sync;
type FutureFn = dyn Fn(ActionCall) -> BoxFuture<'static, Result<Value, InvokeError>> + Send + Sync;

/// One suspending step of a sequence handler.
pub type SequenceStep =
    Arc<dyn Fn(Namespace, Value) -> BoxFuture<'static, Result<Value, InvokeError>> + Send + Sync>;

/// An action handler, tagged with its execution kind.
#[derive(Clone)]
pub enum ActionHandler {
    /// Plain synchronous closure; its return value is still surfaced
    /// through the action's asynchronous result
    Sync(Arc<SyncFn>),
    /// Asynchronous closure
    Future(Arc<FutureFn>),
    /// Suspending steps run in order by the sequential driver
    Sequence(Arc<Vec<SequenceStep>>),
}

impl ActionHandler {
    /// A plain synchronous handler.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ActionCall) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// An asynchronous handler.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
    {
        Self::Future(Arc::new(move |call| f(call).boxed()))
    }

    /// A sequence handler built from suspending steps; see [`ActionHandler::step`].
    pub fn sequence<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = SequenceStep>,
    {
        Self::Sequence(Arc::new(steps.into_iter().collect()))
    }

    /// Box one suspending step for a sequence handler.
    pub fn step<F, Fut>(f: F) -> SequenceStep
    where
        F: Fn(Namespace, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
    {
        Arc::new(move |context, input| f(context, input).boxed())
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Future(_) => "future",
            Self::Sequence(_) => "sequence",
        }
    }
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ActionHandler").field(&self.kind()).finish()
    }
}

struct ActionInner {
    name: String,
    context: Namespace,
    handler: ActionHandler,
}

/// A registered action. Cheap to clone; clones refer to the same action.
#[derive(Clone)]
pub struct Action {
    inner: Arc<ActionInner>,
}

impl Action {
    fn new(name: &str, context: Namespace, handler: ActionHandler) -> Self {
        Self {
            inner: Arc::new(ActionInner {
                name: name.to_string(),
                context,
                handler,
            }),
        }
    }

    /// Local name of the action.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The dedicated namespace node the handler executes against.
    pub fn context(&self) -> &Namespace {
        &self.inner.context
    }

    /// Invoke the action. Every outcome, including a synchronous handler's
    /// return value, is observable only through the returned future.
    pub fn invoke(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value, InvokeError>> {
        let action = self.clone();
        let span = self.inner.context.span().clone();
        async move {
            match &action.inner.handler {
                ActionHandler::Sync(f) => (**f)(&ActionCall {
                    action: action.clone(),
                    args,
                }),
                ActionHandler::Future(f) => {
                    (**f)(ActionCall {
                        action: action.clone(),
                        args,
                    })
                    .await
                }
                ActionHandler::Sequence(steps) => {
                    drive_sequence(steps, action.context(), args).await
                }
            }
        }
        .instrument(span)
        .boxed()
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("path", &self.inner.context.path())
            .field("handler", &self.inner.handler.kind())
            .finish()
    }
}

/// Sequential driver: resume each step with the previous step's result,
/// stopping at the first failure. The first step receives the argument
/// list as an array.
async fn drive_sequence(
    steps: &[SequenceStep],
    context: &Namespace,
    args: Vec<Value>,
) -> Result<Value, InvokeError> {
    let mut current = Value::Array(args);
    for step in steps {
        current = (**step)(context.clone(), current).await?;
    }
    Ok(current)
}

/// One invocation of an action, handed to its handler.
pub struct ActionCall {
    action: Action,
    args: Vec<Value>,
}

impl ActionCall {
    /// The action's execution context; delegation reaches every ancestor.
    pub fn context(&self) -> &Namespace {
        self.action.context()
    }

    /// All arguments of this invocation.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// A single argument by position.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Invoke this action again, recursively.
    pub fn execute(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value, InvokeError>> {
        self.action.invoke(args)
    }
}

impl std::fmt::Debug for ActionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCall")
            .field("path", &self.action.context().path())
            .field("args", &self.args)
            .finish()
    }
}

impl Namespace {
    /// Register an action at a dotted path relative to this node.
    ///
    /// The final segment is the action name; the prefix is resolved the
    /// same way [`Namespace::namespace`] resolves paths. Registering over
    /// an existing action at the identical path replaces it.
    pub fn define_action(
        &self,
        path: &str,
        handler: ActionHandler,
    ) -> Result<&Self, CompositionError> {
        util::validate_namespace_name(path)?;
        let (prefix, name) = match path.rsplit_once('.') {
            Some((prefix, name)) => (prefix, name),
            None => ("", path),
        };
        let host = self.namespace(prefix)?;
        host.create_action(name, handler)?;
        Ok(self)
    }

    /// Create an action on this node under a single local name.
    pub(crate) fn create_action(
        &self,
        name: &str,
        handler: ActionHandler,
    ) -> Result<Action, CompositionError> {
        {
            let mut members = self.inner.members.write();
            match members.get(name) {
                // Same-path re-registration overwrites the previous callable.
                Some(Member::Action(previous)) => {
                    let path = previous.context().path().to_string();
                    tracing::warn!(parent: &self.inner.span, %path, "action overwritten");
                    self.app().emit(Event::ActionOverwritten { path });
                    members.remove(name);
                }
                Some(_) => {
                    return Err(CompositionError::illegal_namespace(self.path(), name));
                }
                None => {}
            }
        }
        // A fresh child node becomes the handler's execution context, then
        // the member slot is taken over by the callable itself.
        let context = self.create_namespace(name)?;
        let action = Action::new(name, context, handler);
        self.inner
            .members
            .write()
            .insert(name.to_string(), Member::Action(action.clone()));
        self.app().emit(Event::ActionRegistered {
            path: action.context().path().to_string(),
        });
        Ok(action)
    }

    /// The action at a dotted path, if one is registered there.
    ///
    /// The first segment is searched by delegation; the rest are direct
    /// members.
    pub fn action(&self, path: &str) -> Option<Action> {
        self.resolve_action(path).ok()
    }

    /// Invoke the action at a dotted path.
    ///
    /// Lookup failures and handler failures alike surface through the
    /// returned future.
    pub fn call(&self, path: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value, InvokeError>> {
        match self.resolve_action(path) {
            Ok(action) => action.invoke(args),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    fn resolve_action(&self, path: &str) -> Result<Action, InvokeError> {
        let not_found = || InvokeError::ActionNotFound {
            path: path.to_string(),
        };
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(not_found)?;
        let mut member = self.lookup(first).ok_or_else(not_found)?;
        for segment in segments {
            let ns = match member {
                Member::Namespace(ns) => ns,
                _ => return Err(not_found()),
            };
            member = ns.own_member(segment).ok_or_else(not_found)?;
        }
        match member {
            Member::Action(action) => Ok(action),
            _ => Err(not_found()),
        }
    }
}
