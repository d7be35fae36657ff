//! Request handle passed through every lifecycle phase.
//!
//! The engine treats the request as opaque: it only reads the HTTP method
//! (through the dispatcher) and the `callback` query parameter used by
//! `jsonp`. Everything else is for filters, listeners and actions.

use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::ids::RequestId;

/// Header carrying a caller-supplied request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum inline path/query parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation
/// Most requests have ≤16 headers (JSF: no heap in hot path)
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage (name, value)
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header storage (name, value)
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Incoming request as seen by controllers.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without query string
    pub path: String,
    /// Path parameters extracted by the router (`controller`, `action`, ...)
    pub path_params: ParamVec,
    /// Query string parameters
    pub query_params: ParamVec,
    /// HTTP headers
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl Request {
    /// Create an empty request for `method` and `path`.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            path_params: ParamVec::new(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    /// Add a path parameter.
    #[must_use]
    pub fn with_path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.path_params.push((Arc::from(name), value.into()));
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }

    /// Add a header.
    ///
    /// A valid `X-Request-Id` header replaces the generated request id so
    /// log lines correlate with the caller's.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics for duplicated names.
    #[inline]
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: `?limit=10&limit=20` yields `20`.
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_lookup_last_wins() {
        let req = Request::new(Method::GET, "/home")
            .with_query_param("limit", "10")
            .with_query_param("limit", "20")
            .with_path_param("controller", "home");
        assert_eq!(req.query_param("limit"), Some("20"));
        assert_eq!(req.path_param("controller"), Some("home"));
        assert_eq!(req.path_param("action"), None);
    }

    #[test]
    fn test_header_case_insensitive() {
        let req = Request::new(Method::GET, "/").with_header("Accept", "text/html");
        assert_eq!(req.header("accept"), Some("text/html"));
    }

    #[test]
    fn test_request_id_taken_from_header() {
        let id = RequestId::new();
        let req = Request::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(req.request_id, id);
        assert_eq!(req.header("x-request-id"), Some(id.to_string().as_str()));

        let original = Request::new(Method::GET, "/");
        let before = original.request_id;
        let req = original.with_header("X-Request-Id", "abc");
        assert_ne!(req.request_id, before);
        assert_eq!(req.header("x-request-id"), Some("abc"));
    }
}
