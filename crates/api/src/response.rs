//! Response envelopes shared by every handler.
//!
//! Success payloads ride inside `{ "data": ... }` and failures inside
//! `{ "error": ..., "code": ... }`. Keeping the two shapes as real types
//! rather than ad-hoc `json!` blocks keeps the wire format consistent
//! across endpoints.

use serde::Serialize;

/// Success envelope: `{ "data": T }`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Failure envelope: `{ "error": "...", "code": "..." }`.
///
/// `code` is a stable machine-readable discriminator (`NOT_FOUND`,
/// `VALIDATION_ERROR`, ...); `error` is the human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}
