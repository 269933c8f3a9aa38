//! The per-request value handed to a handler.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use mediastack_model::ApiError;

use crate::route::HttpMethod;

/// Raw path parameter bindings, name to exact URL segment text.
pub type Params = BTreeMap<String, String>;

/// Everything a handler knows about the request.
///
/// Built once per request after matching and validation succeed. `params`
/// holds exactly the names declared by the matched pattern, bound to the raw
/// segment text (no percent-decoding). `body` is the decoded JSON body after
/// body-shape validation, or `null` for an empty body.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request method.
    pub method: HttpMethod,
    /// Request target as received, including any query string.
    pub url: String,
    /// Request headers. Lookups are case-insensitive.
    pub headers: http::HeaderMap,
    /// Path parameter bindings.
    pub params: Params,
    /// Decoded body.
    pub body: Value,
}

impl RequestContext {
    /// A path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Deserialize the body into a typed input.
    ///
    /// Body shapes are checked before the handler runs, so this only fails
    /// when the declared shape and `T` disagree.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(&self.body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))
    }

    /// Deserialize the path parameters into a typed input.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(params_to_value(&self.params))
            .map_err(|e| ApiError::bad_request(format!("Invalid path parameters: {e}")))
    }
}

/// Render parameter bindings as a JSON object of strings.
#[must_use]
pub fn params_to_value(params: &Params) -> Value {
    Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}
