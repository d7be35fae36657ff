//! # Response Module
//!
//! The response side of a request has two layers:
//!
//! - [`ResponseSink`] is the concrete I/O layer. It exposes a single
//!   low-level primitive, [`ResponseSink::emit`], that writes a complete
//!   [`Emission`] and closes the response.
//! - [`Response`] is the handle controllers use. Its finishing operations
//!   (`render`, `json`, `jsonp`, `send`, `send_file`, `download`, `redirect`,
//!   `end`) all funnel into `emit`, and every one of them passes through the
//!   result interceptor so the post-action lifecycle phases run exactly once.
//!
//! Higher-level operations delegate to lower-level ones the way common HTTP
//! frameworks do:
//!
//! ```text
//! render ──► send ──► end ──► ResponseSink::emit
//! json ────► send
//! jsonp ───► send
//! download ► send_file ► end
//! redirect ─────────────► end
//! ```

mod handle;
mod sink;

pub use handle::Response;
pub use sink::{RecordingSink, ResponseSink};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use http::StatusCode;

use crate::request::HeaderVec;

/// The fixed set of operations that emit output and end request processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishingOp {
    Render,
    Json,
    Jsonp,
    Send,
    SendFile,
    Download,
    Redirect,
    End,
}

impl FinishingOp {
    /// Every finishing operation the interceptor guards.
    pub const ALL: [FinishingOp; 8] = [
        FinishingOp::Render,
        FinishingOp::Json,
        FinishingOp::Jsonp,
        FinishingOp::Send,
        FinishingOp::SendFile,
        FinishingOp::Download,
        FinishingOp::Redirect,
        FinishingOp::End,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FinishingOp::Render => "render",
            FinishingOp::Json => "json",
            FinishingOp::Jsonp => "jsonp",
            FinishingOp::Send => "send",
            FinishingOp::SendFile => "sendFile",
            FinishingOp::Download => "download",
            FinishingOp::Redirect => "redirect",
            FinishingOp::End => "end",
        }
    }
}

impl fmt::Display for FinishingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response payload handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    /// A file the sink streams from disk
    File(PathBuf),
}

impl Body {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

/// Complete response written by [`ResponseSink::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub status: StatusCode,
    pub headers: HeaderVec,
    pub body: Body,
}

impl Emission {
    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and headers accumulated before the response is emitted.
#[derive(Debug, Clone)]
pub(crate) struct ResponseParts {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderVec,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
        }
    }
}

impl ResponseParts {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    pub(crate) fn set_default_header(&mut self, name: &str, value: &str) {
        if self.header(name).is_none() {
            self.headers.push((Arc::from(name), value.to_string()));
        }
    }
}
