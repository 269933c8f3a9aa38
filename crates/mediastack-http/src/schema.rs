//! Pluggable structural validation.
//!
//! A route declares the shape its path parameters and body must have as any
//! [`Shape`]. The engine only ever calls [`Shape::validate`]; which mechanism
//! describes the shape is up to the route:
//!
//! - [`Schema`]: a small structural description (strings, numbers, enums,
//!   objects, arrays) with field-level error paths
//! - [`Typed`]: "whatever deserializes into `T`"
//! - [`Predicate`]: an arbitrary check over the raw value
//!
//! Validation stops at the first violation.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// The first violation found while validating a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Location of the violation, e.g. `parts[0].eTag`. Empty for the root.
    pub path: String,
    /// What is wrong at that location.
    pub message: String,
}

impl ValidationError {
    /// A violation at the root of the value.
    #[must_use]
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }

    fn at(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Capability to check a candidate value and produce the validated value.
///
/// The returned value replaces the input; a shape may normalize it (for
/// example by dropping undeclared object keys).
pub trait Shape: Send + Sync + fmt::Debug {
    /// Validate `value`, returning the validated value or the first violation.
    fn validate(&self, value: Value) -> Result<Value, ValidationError>;
}

/// A bound with the message reported when it is violated.
#[derive(Debug, Clone, PartialEq)]
pub struct Limit<T> {
    /// The bound.
    pub value: T,
    /// Reported on violation.
    pub message: String,
}

/// Built-in structural description of a JSON value.
///
/// # Examples
///
/// ```
/// use mediastack_http::{Schema, Shape};
///
/// let shape = Schema::object([
///     ("uploadId", Schema::string().non_empty("uploadId is required")),
///     ("parts", Schema::integer().min(1.0, "parts must be at least 1")),
/// ]);
///
/// let err = shape.validate(serde_json::json!({"uploadId": "u", "parts": 0})).unwrap_err();
/// assert_eq!(err.to_string(), "parts: parts must be at least 1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts anything, unchanged.
    Any,
    /// A JSON string, optionally with a minimum length in characters.
    String {
        /// Minimum number of characters.
        min_len: Option<Limit<usize>>,
    },
    /// A JSON number.
    Number {
        /// Reject numbers with a fractional part.
        integer: bool,
        /// Inclusive lower bound.
        min: Option<Limit<f64>>,
        /// Inclusive upper bound.
        max: Option<Limit<f64>>,
    },
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    /// An object with required fields. Undeclared keys are dropped.
    Object(Vec<(String, Schema)>),
    /// An array whose every element has the same shape.
    Array(Box<Schema>),
}

impl Schema {
    /// Any string.
    #[must_use]
    pub fn string() -> Self {
        Self::String { min_len: None }
    }

    /// Any number.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            integer: false,
            min: None,
            max: None,
        }
    }

    /// A number without a fractional part.
    #[must_use]
    pub fn integer() -> Self {
        Self::Number {
            integer: true,
            min: None,
            max: None,
        }
    }

    /// One of `values`.
    #[must_use]
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// An object with the given required fields, checked in order.
    #[must_use]
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// An array of `element`.
    #[must_use]
    pub fn array(element: Schema) -> Self {
        Self::Array(Box::new(element))
    }

    /// Require at least one character. Only meaningful on [`Schema::String`];
    /// other variants are returned unchanged.
    #[must_use]
    pub fn non_empty(self, message: impl Into<String>) -> Self {
        match self {
            Self::String { .. } => Self::String {
                min_len: Some(Limit {
                    value: 1,
                    message: message.into(),
                }),
            },
            other => other,
        }
    }

    /// Inclusive lower bound. Only meaningful on [`Schema::Number`]; other
    /// variants are returned unchanged.
    #[must_use]
    pub fn min(self, value: f64, message: impl Into<String>) -> Self {
        match self {
            Self::Number { integer, max, .. } => Self::Number {
                integer,
                min: Some(Limit {
                    value,
                    message: message.into(),
                }),
                max,
            },
            other => other,
        }
    }

    /// Inclusive upper bound. Only meaningful on [`Schema::Number`]; other
    /// variants are returned unchanged.
    #[must_use]
    pub fn max(self, value: f64, message: impl Into<String>) -> Self {
        match self {
            Self::Number { integer, min, .. } => Self::Number {
                integer,
                min,
                max: Some(Limit {
                    value,
                    message: message.into(),
                }),
            },
            other => other,
        }
    }

    fn check(&self, value: Value, path: &str) -> Result<Value, ValidationError> {
        match self {
            Self::Any => Ok(value),
            Self::String { min_len } => {
                let Value::String(s) = &value else {
                    return Err(type_mismatch(path, "string", &value));
                };
                if let Some(limit) = min_len {
                    if s.chars().count() < limit.value {
                        return Err(ValidationError::at(path, limit.message.clone()));
                    }
                }
                Ok(value)
            }
            Self::Number { integer, min, max } => {
                let Some(n) = value.as_f64() else {
                    return Err(type_mismatch(path, "number", &value));
                };
                if *integer && n.fract() != 0.0 {
                    return Err(ValidationError::at(
                        path,
                        "Expected integer, received float",
                    ));
                }
                if let Some(limit) = min {
                    if n < limit.value {
                        return Err(ValidationError::at(path, limit.message.clone()));
                    }
                }
                if let Some(limit) = max {
                    if n > limit.value {
                        return Err(ValidationError::at(path, limit.message.clone()));
                    }
                }
                Ok(value)
            }
            Self::Enum(allowed) => {
                let expected = allowed
                    .iter()
                    .map(|v| format!("'{v}'"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                match &value {
                    Value::String(s) if allowed.iter().any(|v| v == s) => Ok(value),
                    Value::String(s) => Err(ValidationError::at(
                        path,
                        format!("Invalid enum value. Expected {expected}, received '{s}'"),
                    )),
                    other => Err(ValidationError::at(
                        path,
                        format!("Expected {expected}, received {}", type_name(other)),
                    )),
                }
            }
            Self::Object(fields) => {
                let Value::Object(mut input) = value else {
                    return Err(type_mismatch(path, "object", &value));
                };
                let mut output = Map::with_capacity(fields.len());
                for (name, schema) in fields {
                    let field_path = join_field(path, name);
                    let Some(field) = input.remove(name) else {
                        return Err(ValidationError::at(&field_path, "Required"));
                    };
                    output.insert(name.clone(), schema.check(field, &field_path)?);
                }
                Ok(Value::Object(output))
            }
            Self::Array(element) => {
                let Value::Array(items) = value else {
                    return Err(type_mismatch(path, "array", &value));
                };
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| element.check(item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }
}

impl Shape for Schema {
    fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        self.check(value, "")
    }
}

fn join_field(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}.{name}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::at(
        path,
        format!("Expected {expected}, received {}", type_name(value)),
    )
}

/// Accepts any value that deserializes into `T`.
///
/// The validated value is `T` serialized back, so fields `T` does not know
/// about are dropped.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// Create the shape.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T> Shape for Typed<T>
where
    T: DeserializeOwned + Serialize,
{
    fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        let typed = T::deserialize(value).map_err(|e| ValidationError::root(e.to_string()))?;
        serde_json::to_value(typed).map_err(|e| ValidationError::root(e.to_string()))
    }
}

/// Accepts values for which the check returns `Ok`. The value passes through
/// unchanged.
pub struct Predicate<F> {
    name: &'static str,
    check: F,
}

impl<F> Predicate<F>
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    /// Wrap a check. `name` only shows up in debug output.
    pub fn new(name: &'static str, check: F) -> Self {
        Self { name, check }
    }
}

impl<F> fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

impl<F> Shape for Predicate<F>
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        (self.check)(&value).map_err(ValidationError::root)?;
        Ok(value)
    }
}
