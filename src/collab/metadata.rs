use futures::future::BoxFuture;
use serde::Serialize;
use utoipa::ToSchema;

/// Track metadata used only to enrich read-only projections.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TrackMetadata {
    /// Track title, when the provider knows it.
    pub title: Option<String>,
    /// Artist or uploader name.
    pub artist: Option<String>,
    /// Track length in seconds.
    pub duration_secs: Option<u32>,
}

/// Song-metadata provider collaborator.
///
/// A provider failure yields `None`, never an error: enrichment is cosmetic
/// and must not affect core decisions.
pub trait MetadataPort: Send + Sync {
    /// Fetch metadata for an external track reference.
    fn fetch(&self, reference: String) -> BoxFuture<'static, Option<TrackMetadata>>;
}
