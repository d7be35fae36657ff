use std::path::{Path, PathBuf};

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Body, FinishingOp};
use crate::error::HandlerError;
use crate::lifecycle::context::Exchange;
use crate::lifecycle::interceptor::intercept;

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Intercepted response handle for one request.
///
/// Mutators (`status`, `set_header`) only touch pending response parts.
/// Finishing operations end request processing and go through the result
/// interceptor, which decides whether the post-action phases run first.
#[derive(Debug, Clone, Copy)]
pub struct Response<'a> {
    cx: &'a Exchange,
}

impl<'a> Response<'a> {
    pub(crate) fn new(cx: &'a Exchange) -> Self {
        Response { cx }
    }

    /// Set the status code of the pending response.
    pub fn status(&self, status: StatusCode) -> &Self {
        self.cx.parts().status = status;
        self
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&self, name: &str, value: impl Into<String>) -> &Self {
        self.cx.parts().set_header(name, value.into());
        self
    }

    /// Pending header value (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.cx.parts().header(name).map(str::to_string)
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.cx.parts().status
    }

    /// True once the response has been emitted.
    #[must_use]
    pub fn headers_sent(&self) -> bool {
        self.cx.headers_sent()
    }

    /// Render `view` with `locals` and send it as HTML.
    ///
    /// The request's view bag is merged into `locals` under `viewBag`.
    pub fn render(&self, view: impl Into<String>, locals: Value) -> Result<(), HandlerError> {
        let view = view.into();
        intercept(self.cx, FinishingOp::Render, move |cx| {
            let locals = cx.render_locals(locals);
            let html = cx.sink().render(&view, &locals)?;
            cx.parts().set_default_header("Content-Type", HTML);
            cx.response().send(html)
        })
    }

    /// Render the conventional view for the current controller action.
    pub fn view(&self, locals: Value) -> Result<(), HandlerError> {
        let Some(path) = self.cx.view_path() else {
            return Err(HandlerError::msg(format!(
                "no conventional view for action '{}'",
                self.cx.action()
            )));
        };
        self.render(path.to_string_lossy(), locals)
    }

    /// Serialize `value` and send it as `application/json`.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), HandlerError> {
        let body = serde_json::to_string(value)?;
        intercept(self.cx, FinishingOp::Json, move |cx| {
            cx.parts().set_default_header("Content-Type", JSON);
            cx.response().send(body)
        })
    }

    /// Like [`Response::json`], wrapped in the callback named by the request's
    /// JSONP query parameter when present.
    pub fn jsonp<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), HandlerError> {
        let body = serde_json::to_string(value)?;
        let param = &self.cx.host().settings().jsonp_callback;
        let callback = self
            .cx
            .request()
            .query_param(param)
            .map(sanitize_callback)
            .filter(|cb| !cb.is_empty());
        intercept(self.cx, FinishingOp::Jsonp, move |cx| match callback {
            Some(cb) => {
                cx.parts().set_default_header("Content-Type", JAVASCRIPT);
                cx.parts().set_header("X-Content-Type-Options", "nosniff".to_string());
                cx.response()
                    .send(format!("/**/ typeof {cb} === 'function' && {cb}({body});"))
            }
            None => {
                cx.parts().set_default_header("Content-Type", JSON);
                cx.response().send(body)
            }
        })
    }

    /// Send `body`, defaulting the content type from its kind.
    pub fn send(&self, body: impl Into<Body>) -> Result<(), HandlerError> {
        let body = body.into();
        intercept(self.cx, FinishingOp::Send, move |cx| {
            match &body {
                Body::Text(_) => cx.parts().set_default_header("Content-Type", HTML),
                Body::Bytes(_) => cx.parts().set_default_header("Content-Type", OCTET_STREAM),
                Body::Empty | Body::File(_) => {}
            }
            cx.response().end_with(body)
        })
    }

    /// Stream the file at `path`, with a content type guessed from its extension.
    pub fn send_file(&self, path: impl AsRef<Path>) -> Result<(), HandlerError> {
        let path = path.as_ref().to_path_buf();
        intercept(self.cx, FinishingOp::SendFile, move |cx| {
            cx.parts()
                .set_default_header("Content-Type", content_type_for(&path));
            cx.response().end_with(Body::File(path))
        })
    }

    /// Send the file at `path` as an attachment.
    ///
    /// `filename` defaults to the file name of `path`.
    pub fn download(
        &self,
        path: impl AsRef<Path>,
        filename: Option<&str>,
    ) -> Result<(), HandlerError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let filename = filename.map(str::to_string).or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });
        intercept(self.cx, FinishingOp::Download, move |cx| {
            let disposition = match filename {
                Some(name) => format!("attachment; filename=\"{}\"", name.replace('"', "\\\"")),
                None => "attachment".to_string(),
            };
            cx.parts().set_header("Content-Disposition", disposition);
            cx.response().send_file(path)
        })
    }

    /// Redirect to `location` with `302 Found`.
    pub fn redirect(&self, location: impl Into<String>) -> Result<(), HandlerError> {
        self.redirect_with(StatusCode::FOUND, location)
    }

    /// Redirect to `location` with an explicit status.
    pub fn redirect_with(
        &self,
        status: StatusCode,
        location: impl Into<String>,
    ) -> Result<(), HandlerError> {
        let location = location.into();
        intercept(self.cx, FinishingOp::Redirect, move |cx| {
            {
                let mut parts = cx.parts();
                parts.status = status;
                parts.set_header("Location", location.clone());
                parts.set_default_header("Content-Type", "text/plain; charset=utf-8");
            }
            cx.response()
                .end_with(Body::Text(format!("Redirecting to {location}")))
        })
    }

    /// End the response with no body.
    pub fn end(&self) -> Result<(), HandlerError> {
        self.end_with(Body::Empty)
    }

    /// End the response with `body`. Every other finishing operation lands here.
    pub fn end_with(&self, body: impl Into<Body>) -> Result<(), HandlerError> {
        let body = body.into();
        intercept(self.cx, FinishingOp::End, move |cx| {
            debug!(
                request_id = %cx.request_id(),
                status = cx.parts().status.as_u16(),
                "Emitting response"
            );
            cx.emit(body)
        })
    }
}

/// Keep only characters that are valid in a JavaScript callback path.
fn sanitize_callback(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
        .collect()
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => HTML,
        Some("json") => JSON,
        Some("js" | "mjs") => JAVASCRIPT,
        Some("css") => "text/css; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => OCTET_STREAM,
    }
}
