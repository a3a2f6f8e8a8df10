//! Wire-format types of the HTTP surface.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Health probe payloads.
pub mod health;
/// Read-only competition projections.
pub mod status;
/// Vote ingestion payloads.
pub mod vote;

/// Render a timestamp the way every response field does (RFC 3339).
pub(crate) fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
