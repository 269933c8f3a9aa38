//! Route definitions: method, path pattern, handler and declared shapes.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Handler;
use crate::schema::Shape;

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Map a request method onto a routable method.
    ///
    /// Returns `None` for methods no route can be registered for, such a
    /// request never matches anything.
    #[must_use]
    pub fn from_method(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET => Some(Self::Get),
            http::Method::POST => Some(Self::Post),
            http::Method::PUT => Some(Self::Put),
            http::Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    /// The method name as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly (case-sensitive, no decoding).
    Literal(String),
    /// Matches any segment and binds its raw text to the name.
    Param(String),
}

/// A parsed path template such as `/api/media/:id/finalize`.
///
/// Parsing splits on `/` and drops empty segments, so leading, trailing and
/// repeated slashes are insignificant: `api/media/:id` and `/api//media/:id/`
/// are the same pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a path template. A segment starting with `:` is a parameter.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(s.to_owned()),
            })
            .collect();
        Self {
            raw: pattern.to_owned(),
            segments,
        }
    }

    /// The parsed segments, in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every parameter segment, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// The template exactly as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A registered route. Immutable once built.
///
/// # Examples
///
/// ```
/// use mediastack_http::{HandlerError, HandlerResponse, HttpMethod, Route, RequestContext, Schema};
///
/// let route = Route::new(HttpMethod::Get, "/api/hello/:name", |ctx: RequestContext| async move {
///     let name = ctx.param("name").unwrap_or_default().to_owned();
///     Ok::<_, HandlerError>(HandlerResponse::ok(serde_json::json!({
///         "message": format!("Hello {name}!"),
///     })))
/// })
/// .with_params(Schema::object([("name", Schema::string().non_empty("name is required"))]));
///
/// assert_eq!(route.pattern.as_str(), "/api/hello/:name");
/// ```
#[derive(Clone)]
pub struct Route {
    /// The method this route answers.
    pub method: HttpMethod,
    /// The parsed path template.
    pub pattern: RoutePattern,
    handler: Arc<dyn Handler>,
    params_shape: Option<Arc<dyn Shape>>,
    body_shape: Option<Arc<dyn Shape>>,
}

impl Route {
    /// Create a route with no declared shapes.
    pub fn new(method: HttpMethod, pattern: &str, handler: impl Handler) -> Self {
        Self {
            method,
            pattern: RoutePattern::parse(pattern),
            handler: Arc::new(handler),
            params_shape: None,
            body_shape: None,
        }
    }

    /// Declare the shape the path parameters must satisfy.
    #[must_use]
    pub fn with_params(mut self, shape: impl Shape + 'static) -> Self {
        self.params_shape = Some(Arc::new(shape));
        self
    }

    /// Declare the shape the decoded body must satisfy.
    #[must_use]
    pub fn with_body(mut self, shape: impl Shape + 'static) -> Self {
        self.body_shape = Some(Arc::new(shape));
        self
    }

    /// The handler invoked once matching and validation succeed.
    #[must_use]
    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    /// The declared parameter shape, if any.
    #[must_use]
    pub fn params_shape(&self) -> Option<&dyn Shape> {
        self.params_shape.as_deref()
    }

    /// The declared body shape, if any.
    #[must_use]
    pub fn body_shape(&self) -> Option<&dyn Shape> {
        self.body_shape.as_deref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("params_shape", &self.params_shape)
            .field("body_shape", &self.body_shape)
            .finish_non_exhaustive()
    }
}
