//! Per-request options.

use serde::{Deserialize, Serialize};

use crate::http::HttpMethod;

/// How a 200 response body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Parse the body as JSON.
    #[default]
    Json,
    /// Hand the body back untouched.
    Raw,
}

/// Options for a single `send`. Every field defaults independently, so a
/// partial JSON document such as `{"response_kind":"raw"}` deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendOptions {
    pub response_kind: ResponseKind,
    pub method: HttpMethod,
    pub report_upload_progress: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_kind(mut self, kind: ResponseKind) -> Self {
        self.response_kind = kind;
        self
    }

    pub fn method(mut self, method: impl Into<HttpMethod>) -> Self {
        self.method = method.into();
        self
    }

    pub fn report_upload_progress(mut self, enabled: bool) -> Self {
        self.report_upload_progress = enabled;
        self
    }
}
