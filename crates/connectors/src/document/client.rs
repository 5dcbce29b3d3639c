use crate::document::error::DocumentError;
use async_trait::async_trait;
use serde_json::{Map, Value as Json};

/// One round of identifier-range pagination:
/// `find({id: {$gt: after}}).sort({id: 1}).limit(limit)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub id_field: String,
    /// Identifier of the last document already pushed, in extended JSON.
    pub after: Option<Json>,
    /// Projection; empty returns whole documents.
    pub fields: Vec<String>,
    pub limit: usize,
}

/// Capability a document store exposes to [`CollectionSource`]. Documents
/// cross this seam as relaxed extended JSON so identifiers such as ObjectIds
/// survive a trip through the checkpoint hash unchanged.
///
/// [`CollectionSource`]: crate::document::source::CollectionSource
#[async_trait]
pub trait DocumentClient: Send + Sync {
    fn database(&self) -> &str;

    fn collection(&self) -> &str;

    async fn count(&self) -> Result<u64, DocumentError>;

    async fn find_page(&self, request: &PageRequest) -> Result<Vec<Map<String, Json>>, DocumentError>;

    async fn close(&mut self) -> Result<(), DocumentError>;
}
