//! Service definitions: how embedding code describes a remotable type.
//!
//! A [`ServiceDefinition`] pairs a constructor with an explicit table of
//! exported methods, each a typed closure registered by name. Clients can
//! only reach names present in that table.
//!
//! ```ignore
//! let greeter = ServiceDefinition::builder(|_ctx, args| {
//!     Ok(Greeter { greeting: args.get::<String>(0)? })
//! })
//! .method("hello", |this: &Greeter, args| {
//!     Ok(format!("{} {}", this.greeting, args.get::<String>(0)?))
//! })
//! .build();
//! ```

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use remoting_protocol::RemotingError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::bridge::{Reply, panic_error};
use crate::session::Session;

/// A constructed instance, type-erased.
pub(crate) type Object = Arc<dyn Any + Send + Sync>;

type Constructor = Box<dyn Fn(&InstanceContext, Args) -> Result<Object, RemotingError> + Send + Sync>;
type Method = Box<dyn Fn(&Object, Args) -> Reply + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Construction context and arguments
// ─────────────────────────────────────────────────────────────────────────────

/// What a constructor sees besides its arguments.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    connection: usize,
    session: Session,
    exports: Arc<[String]>,
}

impl InstanceContext {
    pub fn new(connection: usize, session: Session, exports: Arc<[String]>) -> Self {
        Self {
            connection,
            session,
            exports,
        }
    }

    /// Id of the owning connection.
    pub fn connection_id(&self) -> usize {
        self.connection
    }

    /// The owning connection's shared session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Method names this instance exports.
    pub fn exports(&self) -> &[String] {
        &self.exports
    }
}

/// Positional arguments for a constructor or method call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Decode a required argument.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, RemotingError> {
        let value = self
            .0
            .get(index)
            .ok_or_else(|| RemotingError::invalid_arguments(format!("Missing argument {index}")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| RemotingError::invalid_arguments(format!("Argument {index}: {e}")))
    }

    /// Decode an optional argument; missing and `null` are both `None`.
    pub fn opt<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, RemotingError> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(index).map(Some),
        }
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Definition
// ─────────────────────────────────────────────────────────────────────────────

/// A constructor plus its exported method table.
pub struct ServiceDefinition {
    constructor: Constructor,
    methods: Vec<(String, Method)>,
    exports: Arc<[String]>,
}

impl ServiceDefinition {
    /// Start a definition for instances of `T`.
    pub fn builder<T, F>(constructor: F) -> ServiceBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&InstanceContext, Args) -> Result<T, RemotingError> + Send + Sync + 'static,
    {
        ServiceBuilder {
            constructor: Box::new(move |ctx: &InstanceContext, args: Args| {
                constructor(ctx, args).map(|t| Arc::new(t) as Object)
            }),
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Exported method names, in declaration order.
    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    pub(crate) fn exports_handle(&self) -> Arc<[String]> {
        Arc::clone(&self.exports)
    }

    pub fn is_exported(&self, method: &str) -> bool {
        self.exports.iter().any(|m| m == method)
    }

    /// Run the constructor. A panic becomes an error.
    pub(crate) fn construct(&self, ctx: &InstanceContext, args: Args) -> Result<Object, RemotingError> {
        panic::catch_unwind(AssertUnwindSafe(|| (self.constructor)(ctx, args)))
            .unwrap_or_else(|payload| Err(panic_error(payload)))
    }

    pub(crate) fn call(&self, object: &Object, method: &str, args: Args) -> Reply {
        match self.methods.iter().find(|(name, _)| name == method) {
            Some((_, call)) => panic::catch_unwind(AssertUnwindSafe(|| call(object, args)))
                .unwrap_or_else(|payload| Reply::err(panic_error(payload))),
            None => Reply::err(RemotingError::no_such_method(method)),
        }
    }
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`ServiceDefinition::builder`].
pub struct ServiceBuilder<T> {
    constructor: Constructor,
    methods: Vec<(String, Method)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ServiceBuilder<T> {
    /// Export a method that answers synchronously.
    pub fn method<R, F>(self, name: &str, handler: F) -> Self
    where
        R: Serialize,
        F: Fn(&T, Args) -> Result<R, RemotingError> + Send + Sync + 'static,
    {
        let call: Method = Box::new(move |object: &Object, args: Args| {
            let Some(this) = (**object).downcast_ref::<T>() else {
                return Reply::err(type_mismatch());
            };
            Reply::Ready(handler(this, args).and_then(to_json))
        });
        self.export(name, call)
    }

    /// Export a method that answers with a future.
    pub fn async_method<R, F, Fut>(self, name: &str, handler: F) -> Self
    where
        R: Serialize + 'static,
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RemotingError>> + Send + 'static,
    {
        let call: Method = Box::new(move |object: &Object, args: Args| {
            let Ok(this) = Arc::clone(object).downcast::<T>() else {
                return Reply::err(type_mismatch());
            };
            let pending = handler(this, args);
            Reply::Pending(Box::pin(async move { pending.await.and_then(to_json) }))
        });
        self.export(name, call)
    }

    /// Redeclaring a name replaces the earlier method in place.
    fn export(mut self, name: &str, call: Method) -> Self {
        match self.methods.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = call,
            None => self.methods.push((name.to_string(), call)),
        }
        self
    }

    pub fn build(self) -> ServiceDefinition {
        let exports: Arc<[String]> = self.methods.iter().map(|(name, _)| name.clone()).collect();
        ServiceDefinition {
            constructor: self.constructor,
            methods: self.methods,
            exports,
        }
    }
}

fn to_json<R: Serialize>(value: R) -> Result<Value, RemotingError> {
    serde_json::to_value(value).map_err(RemotingError::from)
}

fn type_mismatch() -> RemotingError {
    RemotingError::generic("Instance does not match its service definition")
}

// ─────────────────────────────────────────────────────────────────────────────
// Live instance
// ─────────────────────────────────────────────────────────────────────────────

/// A constructed object together with the definition it came from.
///
/// Holding the definition keeps the instance usable after its service is
/// unregistered or replaced.
#[derive(Clone)]
pub(crate) struct Instance {
    definition: Arc<ServiceDefinition>,
    object: Object,
}

impl Instance {
    pub(crate) fn new(definition: Arc<ServiceDefinition>, object: Object) -> Self {
        Self { definition, object }
    }

    pub(crate) fn exports(&self) -> &[String] {
        self.definition.exports()
    }

    pub(crate) fn is_exported(&self, method: &str) -> bool {
        self.definition.is_exported(method)
    }

    pub(crate) fn invoke(&self, method: &str, args: Args) -> Reply {
        self.definition.call(&self.object, method, args)
    }
}
