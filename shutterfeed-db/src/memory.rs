//! A [`DocumentStore`] that keeps everything in process memory.

use crate::store::{Document, DocumentStore, Result, StoreError, StoredObject};
use async_trait::async_trait;
use rand::{Rng, distr::Alphanumeric};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::trace;

pub const DOCUMENT_ID_LEN: usize = 20;

type DocumentKey = (String, String);
type SubcollectionKey = (String, String, String);

#[derive(Debug, Default)]
struct Contents {
    documents: BTreeMap<DocumentKey, Document>,
    subcollections: BTreeMap<SubcollectionKey, BTreeMap<String, Document>>,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug)]
pub struct MemoryStore {
    base_url: String,
    contents: Mutex<Contents>,
}

impl MemoryStore {
    /// Download URLs are formed as `{base_url}/{path}`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            contents: Mutex::default(),
        }
    }

    #[must_use]
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.lock().objects.get(path).cloned()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    fn lock(&self) -> MutexGuard<'_, Contents> {
        // Every mutation below is a single map operation, so a poisoned lock
        // still guards consistent contents.
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

fn key(collection: &str, id: &str) -> DocumentKey {
    (collection.to_owned(), id.to_owned())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn generate_document_id(&self, _collection: &str) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(DOCUMENT_ID_LEN)
            .map(char::from)
            .collect()
    }

    async fn upload_object(&self, path: &str, object: StoredObject) -> Result<String> {
        if path.is_empty() {
            return Err(StoreError::Rejected("empty object path".to_owned()));
        }

        trace!(path, size = object.bytes.len(), "Storing object");
        self.lock().objects.insert(path.to_owned(), object);
        Ok(format!("{}/{path}", self.base_url))
    }

    async fn delete_object(&self, path: &str) -> Result<()> {
        self.lock()
            .objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::ObjectNotFound(path.to_owned()))
    }

    async fn put_document(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        trace!(collection, id, "Writing document");
        self.lock().documents.insert(key(collection, id), document);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self.lock().documents.get(&key(collection, id)).cloned())
    }

    async fn union_update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let mut contents = self.lock();
        let document = contents.documents.get_mut(&key(collection, id)).ok_or_else(|| {
            StoreError::DocumentNotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            }
        })?;

        let entry = document
            .entry(field.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        // A union onto a non-array field replaces it, as hosted stores do.
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(array) = entry {
            for value in values {
                if !array.contains(&value) {
                    array.push(value);
                }
            }
        }

        Ok(())
    }

    async fn put_subdocument(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        sub_id: &str,
        document: Document,
    ) -> Result<()> {
        trace!(collection, id, subcollection, sub_id, "Writing subdocument");
        self.lock()
            .subcollections
            .entry((collection.to_owned(), id.to_owned(), subcollection.to_owned()))
            .or_default()
            .insert(sub_id.to_owned(), document);
        Ok(())
    }

    async fn list_subdocuments(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<Document>> {
        let subcollection_key = (collection.to_owned(), id.to_owned(), subcollection.to_owned());
        Ok(self
            .lock()
            .subcollections
            .get(&subcollection_key)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }
}
