use crate::{
    client::DbClient,
    config::ClientConfig,
    memory::MemoryStore,
    store::{Document, DocumentStore, Result, StoreError, StoredObject},
};
use async_trait::async_trait;
use serde_json::Value;
use shutterfeed_common::model::{
    post::{CreatePost, PostImage, PostKind},
    user::{CreateUser, User, UserHandle},
};
use std::{collections::HashMap, sync::Mutex};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Operation {
    Upload,
    DeleteObject,
    PutDocument,
    GetDocument,
    UnionUpdate,
    PutSubdocument,
    ListSubdocuments,
}

#[derive(Clone, Debug)]
enum Fault {
    Fail(StoreError),
    Hang,
}

/// A [`MemoryStore`] that counts calls and misbehaves on request.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    faults: Mutex<HashMap<Operation, Fault>>,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl FaultyStore {
    pub fn fail(&self, operation: Operation, error: StoreError) {
        self.faults
            .lock()
            .unwrap()
            .insert(operation, Fault::Fail(error));
    }

    pub fn hang(&self, operation: Operation) {
        self.faults.lock().unwrap().insert(operation, Fault::Hang);
    }

    pub fn heal(&self, operation: Operation) {
        self.faults.lock().unwrap().remove(&operation);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    async fn enter(&self, operation: Operation) -> Result<()> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;

        let fault = self.faults.lock().unwrap().get(&operation).cloned();
        match fault {
            None => Ok(()),
            Some(Fault::Fail(error)) => Err(error),
            Some(Fault::Hang) => std::future::pending().await,
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    fn generate_document_id(&self, collection: &str) -> String {
        self.inner.generate_document_id(collection)
    }

    async fn upload_object(&self, path: &str, object: StoredObject) -> Result<String> {
        self.enter(Operation::Upload).await?;
        self.inner.upload_object(path, object).await
    }

    async fn delete_object(&self, path: &str) -> Result<()> {
        self.enter(Operation::DeleteObject).await?;
        self.inner.delete_object(path).await
    }

    async fn put_document(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        self.enter(Operation::PutDocument).await?;
        self.inner.put_document(collection, id, document).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.enter(Operation::GetDocument).await?;
        self.inner.get_document(collection, id).await
    }

    async fn union_update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        self.enter(Operation::UnionUpdate).await?;
        self.inner
            .union_update_field(collection, id, field, values)
            .await
    }

    async fn put_subdocument(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        sub_id: &str,
        document: Document,
    ) -> Result<()> {
        self.enter(Operation::PutSubdocument).await?;
        self.inner
            .put_subdocument(collection, id, subcollection, sub_id, document)
            .await
    }

    async fn list_subdocuments(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<Document>> {
        self.enter(Operation::ListSubdocuments).await?;
        self.inner
            .list_subdocuments(collection, id, subcollection)
            .await
    }
}

pub fn install_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn client() -> DbClient<FaultyStore> {
    client_with(ClientConfig::default())
}

pub fn client_with(config: ClientConfig) -> DbClient<FaultyStore> {
    install_tracing();
    DbClient::new(FaultyStore::default(), config)
}

pub async fn register(client: &DbClient<FaultyStore>, handle: &str) -> User {
    client
        .create_user(CreateUser {
            handle: UserHandle::new(handle),
            full_name: format!("{handle} Example"),
        })
        .await
        .unwrap()
}

pub fn photo(author: &User, caption: &str) -> CreatePost {
    CreatePost {
        kind: PostKind::Image,
        caption: caption.to_owned(),
        author: author.clone(),
        image: Some(PostImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0])),
    }
}
