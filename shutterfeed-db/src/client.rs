use crate::{
    config::ClientConfig,
    record::{
        MalformedRecordError, decode_comment, decode_post_at, decode_user, encode_comment,
        encode_user,
    },
    remote::{RemoteError, within},
    save::{self, SaveError, SaveReport},
    store::{
        COMMENTS_SUBCOLLECTION, DocumentStore, LIKES_SUBCOLLECTION, POSTS_COLLECTION,
        USER_POSTS_FIELD, USERS_COLLECTION,
    },
};
use serde_json::Value;
use shutterfeed_common::model::{
    EmptyIdError, Id,
    comment::{Comment, CreateComment},
    post::{CreatePost, Likes, Post, PostMarker},
    user::{CreateUser, User, UserMarker},
};
use thiserror::Error;
use tracing::{debug, warn};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the store was invalid: {0}")]
    Data(#[from] MalformedRecordError),
    #[error("The store generated an unusable id: {0}")]
    GeneratedId(#[from] EmptyIdError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum LikeOutcome {
    Added,
    /// The user had already liked the post; nothing was written.
    AlreadyLiked,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Recording like of post {post} by user {user} failed: {cause}")]
pub struct LikeError {
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
    #[source]
    pub cause: RemoteError,
}

/// Entry point for persisting users, posts, likes and comments.
///
/// Every operation goes through the store handed to [`DbClient::new`].
/// Operations taking `&mut Post` keep the in-memory post in step with what
/// was written; share a post between tasks behind a lock.
pub struct DbClient<S> {
    store: S,
    config: ClientConfig,
}

impl<S: DocumentStore> DbClient<S> {
    #[must_use]
    pub fn new(store: S, config: ClientConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let user_id = Id::new(self.store.generate_document_id(USERS_COLLECTION))?;
        let user = User::new(user_id, user);

        within(
            self.config.write_timeout(),
            self.store
                .put_document(USERS_COLLECTION, user.id.as_str(), encode_user(&user)),
        )
        .await?;

        debug!(user = %user.id, "Created user");
        Ok(user)
    }

    pub async fn fetch_user(&self, user_id: &Id<UserMarker>) -> Result<Option<User>> {
        let document = within(
            self.config.write_timeout(),
            self.store.get_document(USERS_COLLECTION, user_id.as_str()),
        )
        .await?;

        let user = document.map(decode_user).transpose()?;
        Ok(user)
    }

    /// Builds a new post with a freshly generated id. Nothing is written until
    /// [`DbClient::save_post`].
    pub fn create_post(&self, post: CreatePost) -> Result<Post> {
        let post_id = Id::new(self.store.generate_document_id(POSTS_COLLECTION))?;
        Ok(Post::new(post_id, post))
    }

    pub async fn save_post(&self, post: &mut Post) -> Result<SaveReport, SaveError> {
        save::save_post(&self.store, &self.config, post).await
    }

    pub async fn fetch_post(&self, post_id: &Id<PostMarker>) -> Result<Option<Post>> {
        let document = within(
            self.config.write_timeout(),
            self.store.get_document(POSTS_COLLECTION, post_id.as_str()),
        )
        .await?;

        let post = document
            .map(|document| decode_post_at(post_id, document))
            .transpose()?;
        Ok(post)
    }

    /// Fetches the posts listed in the user's post index, or `None` if the
    /// user does not exist.
    pub async fn fetch_user_posts(&self, user_id: &Id<UserMarker>) -> Result<Option<Vec<Post>>> {
        let Some(user_document) = within(
            self.config.write_timeout(),
            self.store.get_document(USERS_COLLECTION, user_id.as_str()),
        )
        .await?
        else {
            return Ok(None);
        };

        let post_ids: Vec<Id<PostMarker>> = match user_document.get(USER_POSTS_FIELD) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|id| Id::<PostMarker>::new(id).ok())
                .collect(),
            _ => Vec::new(),
        };

        let mut posts = Vec::with_capacity(post_ids.len());
        for post_id in post_ids {
            match self.fetch_post(&post_id).await? {
                Some(post) => posts.push(post),
                None => warn!(user = %user_id, post = %post_id, "Indexed post does not exist"),
            }
        }

        Ok(Some(posts))
    }

    /// Records that `user` likes `post`.
    ///
    /// The like is stored under the user's id, so a user likes a post at most
    /// once. The in-memory likes only change after the write succeeded.
    pub async fn like_post(&self, post: &mut Post, user: &User) -> Result<LikeOutcome, LikeError> {
        if post.likes().contains(&user.id) {
            debug!(post = %post.id, user = %user.id, "Post already liked");
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let written = within(
            self.config.write_timeout(),
            self.store.put_subdocument(
                POSTS_COLLECTION,
                post.id.as_str(),
                LIKES_SUBCOLLECTION,
                user.id.as_str(),
                encode_user(user),
            ),
        )
        .await;

        if let Err(cause) = written {
            warn!(post = %post.id, user = %user.id, error = %cause, "Recording like failed");
            return Err(LikeError {
                post: post.id.clone(),
                user: user.id.clone(),
                cause,
            });
        }

        post.add_like(user.clone());
        Ok(LikeOutcome::Added)
    }

    /// Replaces the in-memory likes of `post` with the stored ones.
    pub async fn load_likes(&self, post: &mut Post) -> Result<()> {
        let documents = within(
            self.config.write_timeout(),
            self.store
                .list_subdocuments(POSTS_COLLECTION, post.id.as_str(), LIKES_SUBCOLLECTION),
        )
        .await?;

        let likes = documents
            .into_iter()
            .map(decode_user)
            .collect::<Result<Likes, _>>()?;
        post.replace_likes(likes);
        Ok(())
    }

    pub async fn add_comment(&self, post: &mut Post, comment: CreateComment) -> Result<Comment> {
        let comment_id = Id::new(self.store.generate_document_id(COMMENTS_SUBCOLLECTION))?;
        let comment = Comment::new(comment_id, comment);

        within(
            self.config.write_timeout(),
            self.store.put_subdocument(
                POSTS_COLLECTION,
                post.id.as_str(),
                COMMENTS_SUBCOLLECTION,
                comment.id.as_str(),
                encode_comment(&comment),
            ),
        )
        .await?;

        post.add_comment(comment.clone());
        Ok(comment)
    }

    /// Replaces the in-memory comments of `post` with the stored ones, oldest
    /// first.
    pub async fn load_comments(&self, post: &mut Post) -> Result<()> {
        let documents = within(
            self.config.write_timeout(),
            self.store
                .list_subdocuments(POSTS_COLLECTION, post.id.as_str(), COMMENTS_SUBCOLLECTION),
        )
        .await?;

        let mut comments = documents
            .into_iter()
            .map(decode_comment)
            .collect::<Result<Vec<_>, _>>()?;
        comments.sort_by(|a, b| {
            a.created_at
                .unix_seconds()
                .total_cmp(&b.created_at.unix_seconds())
        });
        post.replace_comments(comments);
        Ok(())
    }
}
