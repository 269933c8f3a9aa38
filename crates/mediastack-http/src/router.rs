//! Ordered route table and the structural path matcher.
//!
//! Matching is a linear scan in registration order. The first route whose
//! method, segment count and literal segments all fit the request is the
//! match, and matching stops there: if that route later rejects the request
//! (parameter or body validation), no later route is tried.

use crate::context::Params;
use crate::route::{HttpMethod, Route, Segment};

/// Ordered registry of routes. Insertion order is the match tie-break.
///
/// No deduplication or conflict detection: a route shadowed by an earlier
/// one that always matches first is simply unreachable.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    pub fn register(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Append a route, builder style.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.register(route);
        self
    }

    /// Every route, in registration order.
    #[must_use]
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl FromIterator<Route> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

/// A structural match: the route plus its raw parameter bindings.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// Position of the route in the table.
    pub index: usize,
    /// The matched route.
    pub route: &'a Route,
    /// Parameter name to raw URL segment text.
    pub params: Params,
}

/// Find the first route that structurally fits `method` and `path`.
///
/// `path` must not include a query string. Parameter values are the exact
/// segment text, never decoded.
#[must_use]
pub fn match_route<'a>(routes: &'a [Route], method: HttpMethod, path: &str) -> Option<RouteMatch<'a>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    routes.iter().enumerate().find_map(|(index, route)| {
        if route.method != method {
            return None;
        }
        let params = bind(route.pattern.segments(), &segments)?;
        Some(RouteMatch {
            index,
            route,
            params,
        })
    })
}

fn bind(pattern: &[Segment], segments: &[&str]) -> Option<Params> {
    if pattern.len() != segments.len() {
        return None;
    }
    let mut params = Params::new();
    for (expected, actual) in pattern.iter().zip(segments) {
        match expected {
            Segment::Literal(literal) if literal.as_str() == *actual => {}
            Segment::Literal(_) => return None,
            Segment::Param(name) => {
                params.insert(name.clone(), (*actual).to_owned());
            }
        }
    }
    Some(params)
}
