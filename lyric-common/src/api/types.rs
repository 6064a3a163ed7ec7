//! Shared API request/response types
//!
//! Every HTTP response of the lyric player is wrapped in the same envelope:
//!
//! ```json
//! { "code": 200, "message": "success", "data": { ... } }
//! ```
//!
//! `code` mirrors the HTTP status of the response. `data` is `null` for errors
//! and for operations with nothing to return (e.g. stopping playback).

use serde::{Deserialize, Serialize};

/// Message used by every successful response unless a handler overrides it
pub const SUCCESS_MESSAGE: &str = "success";

/// Response envelope `{code, message, data}`
///
/// # Examples
///
/// ```
/// use lyric_common::api::ApiResponse;
///
/// let response = ApiResponse::success(vec![1, 2, 3]);
/// assert_eq!(response.code, 200);
/// assert_eq!(response.message, "success");
///
/// let error: ApiResponse<()> = ApiResponse::error(404, "no song is playing");
/// assert!(error.data.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Status code (equal to the HTTP status)
    pub code: u16,

    /// Human readable outcome
    pub message: String,

    /// Payload (serialized as `null` when absent)
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 200 response carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(data),
        }
    }

    /// 200 response with a custom message and optional payload
    pub fn with_message(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data,
        }
    }

    /// Error response; `code` should be the HTTP status sent alongside
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
