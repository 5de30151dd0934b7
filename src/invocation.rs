//! Per-call data captured when a handler is intercepted.
//!
//! An [`Invocation`] is built by the host for every handler call and lives
//! only as long as that call. It carries the target type, the method
//! identity, the ordered argument list with body flags, and the routing
//! metadata used by the request/response matching policy.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// Routing annotation carried by a handler method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMapping {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    /// Generic mapping not tied to one verb
    Any,
}

impl RequestMapping {
    pub fn from_method(method: &axum::http::Method) -> Self {
        match *method {
            axum::http::Method::GET => RequestMapping::Get,
            axum::http::Method::POST => RequestMapping::Post,
            axum::http::Method::PUT => RequestMapping::Put,
            axum::http::Method::DELETE => RequestMapping::Delete,
            axum::http::Method::PATCH => RequestMapping::Patch,
            _ => RequestMapping::Any,
        }
    }
}

/// One positional argument of an intercepted call.
#[derive(Clone)]
pub struct Argument {
    value: Arc<dyn fmt::Debug + Send + Sync>,
    type_name: &'static str,
    body: bool,
}

impl Argument {
    fn new<A>(value: A, body: bool) -> Self
    where
        A: fmt::Debug + Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            type_name: type_name::<A>(),
            body,
        }
    }

    /// Whether this argument is the request body.
    pub fn is_body(&self) -> bool {
        self.body
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

/// A single intercepted handler call.
///
/// # Examples
///
/// ```rust
/// use logging_starter::{Invocation, RequestMapping};
///
/// #[derive(Debug)]
/// struct Item { id: u32 }
/// struct ItemController;
///
/// let invocation = Invocation::new::<ItemController>("update_item")
///     .controller()
///     .mapping(RequestMapping::Put)
///     .arg(7u32)
///     .body(Item { id: 7 });
///
/// assert_eq!(invocation.method(), "update_item");
/// assert_eq!(invocation.body_arguments().keys().collect::<Vec<_>>(), ["arg1"]);
/// ```
#[derive(Clone)]
pub struct Invocation {
    target: &'static str,
    method: String,
    arguments: Vec<Argument>,
    controller: bool,
    mapping: Option<RequestMapping>,
}

impl Invocation {
    /// Start describing a call to `method` on the handler type `T`.
    pub fn new<T: ?Sized>(method: impl Into<String>) -> Self {
        Self::with_target(type_name::<T>(), method)
    }

    /// Same as [`Invocation::new`] for hosts that only know the target name.
    pub fn with_target(target: &'static str, method: impl Into<String>) -> Self {
        Self {
            target,
            method: method.into(),
            arguments: Vec::new(),
            controller: false,
            mapping: None,
        }
    }

    /// Mark the target as a request-handling controller.
    pub fn controller(mut self) -> Self {
        self.controller = true;
        self
    }

    /// Attach the routing annotation of the method.
    pub fn mapping(mut self, mapping: RequestMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Append a plain argument.
    pub fn arg<A>(mut self, value: A) -> Self
    where
        A: fmt::Debug + Send + Sync + 'static,
    {
        self.arguments.push(Argument::new(value, false));
        self
    }

    /// Append an argument flagged as the request body.
    pub fn body<A>(mut self, value: A) -> Self
    where
        A: fmt::Debug + Send + Sync + 'static,
    {
        self.arguments.push(Argument::new(value, true));
        self
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn is_controller(&self) -> bool {
        self.controller
    }

    pub fn request_mapping(&self) -> Option<RequestMapping> {
        self.mapping
    }

    /// Method signature, e.g. `shop::ItemController::update_item(u32, shop::Item)`.
    pub fn signature(&self) -> String {
        let params = self
            .arguments
            .iter()
            .map(Argument::type_name)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}::{}({})", self.target, self.method, params)
    }

    /// Arguments flagged as request bodies, keyed by their position.
    pub fn body_arguments(&self) -> BodyArguments {
        let entries = self
            .arguments
            .iter()
            .enumerate()
            .filter(|(_, arg)| arg.is_body())
            .map(|(index, arg)| (format!("arg{index}"), arg.clone()))
            .collect();
        BodyArguments { entries }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("target", &self.target)
            .field("method", &self.method)
            .field("arguments", &self.arguments)
            .field("controller", &self.controller)
            .field("mapping", &self.mapping)
            .finish()
    }
}

/// Body-flagged arguments of one call, as `argN -> value` in argument order.
#[derive(Clone, Default)]
pub struct BodyArguments {
    entries: Vec<(String, Argument)>,
}

impl BodyArguments {
    pub fn get(&self, key: &str) -> Option<&Argument> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, arg)| arg)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for BodyArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            map.entry(&format_args!("{key}"), value);
        }
        map.finish()
    }
}
