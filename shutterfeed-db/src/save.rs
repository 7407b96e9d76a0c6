//! Persisting a post: image upload, document write, then linking the post to
//! its author.

use crate::{
    config::ClientConfig,
    record::encode_post,
    remote::{RemoteError, within},
    store::{DocumentStore, POSTS_COLLECTION, StoredObject, USER_POSTS_FIELD, USERS_COLLECTION},
};
use serde_json::Value;
use shutterfeed_common::model::{
    Id,
    post::{Post, PostMarker},
};
use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// The remote step a save failed in.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum SaveStep {
    Upload,
    DocumentWrite,
    LinkUpdate,
}

impl Display for SaveStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SaveStep::Upload => "image upload",
            SaveStep::DocumentWrite => "document write",
            SaveStep::LinkUpdate => "author link update",
        })
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum SaveState {
    Created,
    ImageUploading,
    ImageUploaded,
    DocumentWriting,
    DocumentWritten,
    ParentLinkUpdating,
    Done,
    Aborted(SaveStep),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct SaveReport {
    pub post: Id<PostMarker>,
    pub image_uploaded: bool,
    pub history: Vec<SaveState>,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Saving post {post} failed during {step}: {cause}")]
pub struct SaveError {
    pub post: Id<PostMarker>,
    pub step: SaveStep,
    #[source]
    pub cause: RemoteError,
    /// Download URL of an uploaded image that is still stored although its
    /// post document was never written.
    pub orphaned_image: Option<String>,
    pub history: Vec<SaveState>,
}

impl SaveError {
    /// Whether the post document reached the store before the failure.
    #[must_use]
    pub fn document_written(&self) -> bool {
        self.history.contains(&SaveState::DocumentWritten)
    }
}

struct SaveProgress {
    post: Id<PostMarker>,
    history: Vec<SaveState>,
}

impl SaveProgress {
    fn new(post: Id<PostMarker>) -> Self {
        Self {
            post,
            history: vec![SaveState::Created],
        }
    }

    fn enter(&mut self, state: SaveState) {
        debug!(post = %self.post, ?state, "Save progressed");
        self.history.push(state);
    }

    fn abort(
        mut self,
        step: SaveStep,
        cause: RemoteError,
        orphaned_image: Option<String>,
    ) -> SaveError {
        self.enter(SaveState::Aborted(step));
        warn!(post = %self.post, %step, error = %cause, "Saving post failed");

        SaveError {
            post: self.post,
            step,
            cause,
            orphaned_image,
            history: self.history,
        }
    }

    fn finish(mut self, image_uploaded: bool) -> SaveReport {
        self.enter(SaveState::Done);
        info!(post = %self.post, image_uploaded, "Post saved");

        SaveReport {
            post: self.post,
            image_uploaded,
            history: self.history,
        }
    }
}

fn object_path(post: &Post) -> String {
    format!("{POSTS_COLLECTION}/{}", post.id)
}

/// Saves `post` to `store`, stopping at the first failing step.
///
/// A post without an image payload skips the upload and is written with
/// whatever download URL it already has. The payload is dropped only once
/// every step succeeded, so a failed save can be retried as is.
pub(crate) async fn save_post<S>(
    store: &S,
    config: &ClientConfig,
    post: &mut Post,
) -> Result<SaveReport, SaveError>
where
    S: DocumentStore + ?Sized,
{
    let mut progress = SaveProgress::new(post.id.clone());
    let path = object_path(post);

    let image_uploaded = if let Some(image) = post.image() {
        progress.enter(SaveState::ImageUploading);
        let object = StoredObject {
            bytes: image.bytes.clone(),
            content_type: image.content_type.clone(),
        };

        match within(config.upload_timeout(), store.upload_object(&path, object)).await {
            Ok(url) => post.image_uploaded(url),
            Err(cause) => return Err(progress.abort(SaveStep::Upload, cause, None)),
        }
        progress.enter(SaveState::ImageUploaded);
        true
    } else {
        debug!(post = %post.id, "Post has no image, skipping upload");
        false
    };

    progress.enter(SaveState::DocumentWriting);
    let document = encode_post(post);
    let written = within(
        config.write_timeout(),
        store.put_document(POSTS_COLLECTION, post.id.as_str(), document),
    )
    .await;
    if let Err(cause) = written {
        // A document from an earlier attempt still points at the object.
        let orphaned_image = if image_uploaded && !post.is_stored() {
            remove_orphaned_image(store, config, post, &path).await
        } else {
            None
        };
        return Err(progress.abort(SaveStep::DocumentWrite, cause, orphaned_image));
    }
    post.document_stored();
    progress.enter(SaveState::DocumentWritten);

    progress.enter(SaveState::ParentLinkUpdating);
    let linked = within(
        config.link_timeout(),
        store.union_update_field(
            USERS_COLLECTION,
            post.author.id.as_str(),
            USER_POSTS_FIELD,
            vec![Value::from(post.id.as_str())],
        ),
    )
    .await;
    if let Err(cause) = linked {
        return Err(progress.abort(SaveStep::LinkUpdate, cause, None));
    }

    post.discard_image();
    Ok(progress.finish(image_uploaded))
}

/// Returns the URL of the image if it is still stored afterwards.
async fn remove_orphaned_image<S>(
    store: &S,
    config: &ClientConfig,
    post: &mut Post,
    path: &str,
) -> Option<String>
where
    S: DocumentStore + ?Sized,
{
    let url = post.image_download_url()?.to_owned();

    if !config.cleanup_orphaned_images {
        warn!(post = %post.id, %url, "Leaving orphaned image in storage");
        return Some(url);
    }

    match within(config.upload_timeout(), store.delete_object(path)).await {
        Ok(()) => {
            debug!(post = %post.id, "Removed orphaned image");
            post.image_removed();
            None
        }
        Err(e) => {
            error!(post = %post.id, %url, error = %e, "Could not remove orphaned image");
            Some(url)
        }
    }
}
