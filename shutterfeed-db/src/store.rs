//! The remote document and object storage the client persists through.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub const POSTS_COLLECTION: &str = "posts";
pub const USERS_COLLECTION: &str = "users";
pub const LIKES_SUBCOLLECTION: &str = "likes";
pub const COMMENTS_SUBCOLLECTION: &str = "comments";

/// Field on a user document listing the ids of the user's posts.
pub const USER_POSTS_FIELD: &str = "posts";

/// A stored document: a flat key-value map with JSON-like values.
pub type Document = Map<String, Value>;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} does not exist")]
    DocumentNotFound { collection: String, id: String },
    #[error("Object {0} does not exist")]
    ObjectNotFound(String),
    #[error("The store rejected the request: {0}")]
    Rejected(String),
    #[error("The store is unavailable: {0}")]
    Unavailable(String),
}

/// Bytes to be stored under an object path.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A document database with an attached object storage.
///
/// Document writes are upserts. Implementations decide ordering and atomicity
/// of concurrent writes to the same document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Produces a fresh document id for `collection` without writing anything.
    fn generate_document_id(&self, collection: &str) -> String;

    /// Stores `object` under `path`, replacing any previous object, and returns
    /// its download URL.
    async fn upload_object(&self, path: &str, object: StoredObject) -> Result<String>;

    async fn delete_object(&self, path: &str) -> Result<()>;

    async fn put_document(&self, collection: &str, id: &str, document: Document) -> Result<()>;

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Adds each of `values` to the array `field` unless already present.
    ///
    /// Fails with [`StoreError::DocumentNotFound`] if the document is missing.
    async fn union_update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()>;

    async fn put_subdocument(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        sub_id: &str,
        document: Document,
    ) -> Result<()>;

    async fn list_subdocuments(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<Document>>;
}
