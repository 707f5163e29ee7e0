use async_trait::async_trait;
use querylens_protocol::list::{FilterKind, ListRequest};
use querylens_protocol::records::Record;

use crate::error::SourceError;

/// Backend capability a [`ResultController`](crate::ResultController) fetches through.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    type Row: Record;

    /// Lists rows matching the resolved filters.
    async fn list_results(&self, request: &ListRequest) -> Result<Vec<Self::Row>, SourceError>;

    /// Column identifiers this backend version supports.
    async fn list_available_fields(&self) -> Result<Vec<String>, SourceError>;

    /// Candidate values for a multi-select filter.
    async fn list_filter_values(&self, kind: FilterKind) -> Result<Vec<String>, SourceError>;

    /// One-time token exchanged by a plain GET for a CSV download.
    async fn download_token(&self, request: &ListRequest) -> Result<String, SourceError>;
}
