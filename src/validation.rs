//! Field validation module
//!
//! Declarative per-field checks over the body, query string and cookies of a
//! request. Each [`FieldValidator`] reports at most one violation: the message
//! of its first failing rule.
//!
//! ```ignore
//! let validators = vec![
//!     body("name").not_empty().with_message("Name is required"),
//!     query("page").optional().is_numeric(),
//! ];
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ErrorEntry;
use crate::request::ServiceRequest;

/// Message used when a rule has none of its own
pub const DEFAULT_MESSAGE: &str = "Invalid value";

/// Part of the request a field is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Body,
    Query,
    Cookie,
}

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
enum Rule {
    Exists,
    NotEmpty,
    IsNumeric,
    IsEmail,
    MinLength(usize),
    MaxLength(usize),
    Custom(Predicate),
}

impl Rule {
    fn check(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Exists => value.is_some(),
            Self::NotEmpty => value.is_some_and(|v| !is_empty(v)),
            Self::IsNumeric => value.is_some_and(is_numeric),
            Self::IsEmail => value.and_then(Value::as_str).is_some_and(is_email),
            Self::MinLength(min) => value
                .and_then(Value::as_str)
                .is_some_and(|s| s.chars().count() >= *min),
            Self::MaxLength(max) => value
                .and_then(Value::as_str)
                .is_some_and(|s| s.chars().count() <= *max),
            Self::Custom(predicate) => value.is_some_and(|v| predicate(v)),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists => f.write_str("Exists"),
            Self::NotEmpty => f.write_str("NotEmpty"),
            Self::IsNumeric => f.write_str("IsNumeric"),
            Self::IsEmail => f.write_str("IsEmail"),
            Self::MinLength(n) => write!(f, "MinLength({n})"),
            Self::MaxLength(n) => write!(f, "MaxLength({n})"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A chain of rules applied to one field
#[derive(Debug, Clone)]
pub struct FieldValidator {
    location: Location,
    field: String,
    rules: Vec<(Rule, Option<String>)>,
    optional: bool,
}

/// Validate a JSON body field; dotted names address nested objects
pub fn body(field: impl Into<String>) -> FieldValidator {
    FieldValidator::new(Location::Body, field)
}

/// Validate a query parameter (first value when repeated)
pub fn query(field: impl Into<String>) -> FieldValidator {
    FieldValidator::new(Location::Query, field)
}

/// Validate a cookie
pub fn cookie(field: impl Into<String>) -> FieldValidator {
    FieldValidator::new(Location::Cookie, field)
}

impl FieldValidator {
    pub fn new(location: Location, field: impl Into<String>) -> Self {
        Self {
            location,
            field: field.into(),
            rules: Vec::new(),
            optional: false,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub const fn location(&self) -> Location {
        self.location
    }

    fn rule(mut self, rule: Rule) -> Self {
        self.rules.push((rule, None));
        self
    }

    #[must_use]
    pub fn exists(self) -> Self {
        self.rule(Rule::Exists)
    }

    #[must_use]
    pub fn not_empty(self) -> Self {
        self.rule(Rule::NotEmpty)
    }

    #[must_use]
    pub fn is_numeric(self) -> Self {
        self.rule(Rule::IsNumeric)
    }

    #[must_use]
    pub fn is_email(self) -> Self {
        self.rule(Rule::IsEmail)
    }

    #[must_use]
    pub fn min_length(self, min: usize) -> Self {
        self.rule(Rule::MinLength(min))
    }

    #[must_use]
    pub fn max_length(self, max: usize) -> Self {
        self.rule(Rule::MaxLength(max))
    }

    #[must_use]
    pub fn custom<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::Custom(Arc::new(predicate)))
    }

    /// Skip every rule when the field is missing
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Message of the most recently added rule
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        if let Some((_, slot)) = self.rules.last_mut() {
            *slot = Some(message.into());
        }
        self
    }

    fn extract(&self, req: &ServiceRequest) -> Option<Value> {
        match self.location {
            Location::Body => self
                .field
                .split('.')
                .try_fold(&req.body, |value, key| value.get(key))
                .cloned(),
            Location::Query => req
                .query
                .first(&self.field)
                .map(|v| Value::String(v.to_string())),
            Location::Cookie => req.cookie(&self.field).map(Value::String),
        }
    }

    /// First violation of this field, if any
    pub fn validate(&self, req: &ServiceRequest) -> Option<ErrorEntry> {
        let value = self.extract(req);
        if value.is_none() && self.optional {
            return None;
        }

        self.rules
            .iter()
            .find(|(rule, _)| !rule.check(value.as_ref()))
            .map(|(_, message)| {
                ErrorEntry::field(
                    message.as_deref().unwrap_or(DEFAULT_MESSAGE),
                    self.field.clone(),
                )
            })
    }
}

/// Run every validator and collect one entry per violated field
pub fn collect_violations(validators: &[FieldValidator], req: &ServiceRequest) -> Vec<ErrorEntry> {
    validators
        .iter()
        .filter_map(|validator| validator.validate(req))
        .collect()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty() && s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, Query};
    use hyper::header::{HeaderValue, COOKIE};
    use serde_json::json;

    fn request(body: Value, raw_query: &str) -> ServiceRequest {
        ServiceRequest::new(Method::POST)
            .with_body(body)
            .with_query(Query::parse(raw_query))
    }

    #[test]
    fn test_passing_request_has_no_violations() {
        let req = request(json!({ "name": "Rex", "email": "rex@example.com" }), "page=2");
        let validators = vec![
            body("name").not_empty(),
            body("email").is_email(),
            query("page").is_numeric(),
        ];
        assert!(collect_violations(&validators, &req).is_empty());
    }

    #[test]
    fn test_one_entry_per_field_with_first_failing_message() {
        let req = request(json!({ "name": "" }), "");
        let validators = vec![
            body("name")
                .exists()
                .with_message("Name is required")
                .not_empty()
                .with_message("Name must not be empty")
                .min_length(3),
            body("age").is_numeric(),
        ];
        assert_eq!(
            collect_violations(&validators, &req),
            vec![
                ErrorEntry::field("Name must not be empty", "name"),
                ErrorEntry::field("Invalid value", "age"),
            ]
        );
    }

    #[test]
    fn test_optional_skips_missing_but_checks_present() {
        let validators = vec![query("page").optional().is_numeric()];
        assert!(collect_violations(&validators, &request(Value::Null, "")).is_empty());
        assert_eq!(
            collect_violations(&validators, &request(Value::Null, "page=two")),
            vec![ErrorEntry::field("Invalid value", "page")]
        );
    }

    #[test]
    fn test_nested_body_field() {
        let req = request(json!({ "owner": { "email": "not-an-email" } }), "");
        let validators = vec![body("owner.email").is_email().with_message("Bad email")];
        assert_eq!(
            collect_violations(&validators, &req),
            vec![ErrorEntry::field("Bad email", "owner.email")]
        );
    }

    #[test]
    fn test_cookie_and_custom_rule() {
        let mut req = request(Value::Null, "");
        req.headers
            .insert(COOKIE, HeaderValue::from_static("token=short"));
        let validators = vec![
            cookie("token").custom(|v| v.as_str().is_some_and(|s| s.len() > 8)),
            cookie("session").exists(),
        ];
        let fields: Vec<_> = collect_violations(&validators, &req)
            .into_iter()
            .filter_map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["token".to_string(), "session".to_string()]);
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a b@c.de"));
    }
}
