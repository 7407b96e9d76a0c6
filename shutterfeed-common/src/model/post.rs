use crate::{
    model::{
        Id,
        comment::Comment,
        user::{User, UserMarker},
    },
    util::Timestamp,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// What a post shows. Unknown kinds are carried through unchanged.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum PostKind {
    Image,
    Video,
    Other(String),
}

impl PostKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            PostKind::Image => "image",
            PostKind::Video => "video",
            PostKind::Other(kind) => kind,
        }
    }
}

impl Default for PostKind {
    fn default() -> Self {
        PostKind::Other(String::new())
    }
}

impl From<String> for PostKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "image" => PostKind::Image,
            "video" => PostKind::Video,
            _ => PostKind::Other(value),
        }
    }
}

impl From<PostKind> for String {
    fn from(value: PostKind) -> Self {
        match value {
            PostKind::Other(kind) => kind,
            known => known.as_str().to_owned(),
        }
    }
}

impl Display for PostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded image bytes waiting to be uploaded.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PostImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PostImage {
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/jpeg".to_owned(),
        }
    }
}

impl std::fmt::Debug for PostImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostImage")
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Users who liked a post, at most once each.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Likes(BTreeMap<Id<UserMarker>, User>);

impl Likes {
    /// Returns `false` if the user was already present.
    pub fn insert(&mut self, user: User) -> bool {
        if self.0.contains_key(&user.id) {
            return false;
        }
        self.0.insert(user.id.clone(), user);
        true
    }

    #[must_use]
    pub fn contains(&self, user_id: &Id<UserMarker>) -> bool {
        self.0.contains_key(user_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.0.values()
    }
}

impl FromIterator<User> for Likes {
    fn from_iter<T: IntoIterator<Item = User>>(iter: T) -> Self {
        let mut likes = Likes::default();
        for user in iter {
            likes.insert(user);
        }
        likes
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub kind: PostKind,
    pub caption: String,
    pub author: User,
    pub image: Option<PostImage>,
}

/// A post as held in memory.
///
/// The creation time never changes after construction, and the image download
/// URL is only set by [`Post::image_uploaded`]. Likes and comments are not part
/// of the persisted post document; they are loaded separately.
#[derive(Clone, PartialEq, Debug)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub kind: PostKind,
    pub caption: String,
    pub author: User,
    created_at: Timestamp,
    image_download_url: Option<String>,
    image: Option<PostImage>,
    stored: bool,
    likes: Likes,
    comments: Vec<Comment>,
}

impl Post {
    /// A new, unsaved post created now.
    #[must_use]
    pub fn new(id: Id<PostMarker>, create: CreatePost) -> Self {
        Self {
            id,
            kind: create.kind,
            caption: create.caption,
            author: create.author,
            created_at: Timestamp::now(),
            image_download_url: None,
            image: create.image,
            stored: false,
            likes: Likes::default(),
            comments: Vec::new(),
        }
    }

    /// A post reconstructed from its persisted fields.
    #[must_use]
    pub fn restore(
        id: Id<PostMarker>,
        kind: PostKind,
        caption: String,
        created_at: Timestamp,
        author: User,
        image_download_url: Option<String>,
    ) -> Self {
        Self {
            id,
            kind,
            caption,
            author,
            created_at,
            image_download_url,
            image: None,
            stored: true,
            likes: Likes::default(),
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    #[must_use]
    pub fn image_download_url(&self) -> Option<&str> {
        self.image_download_url.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&PostImage> {
        self.image.as_ref()
    }

    pub fn image_uploaded(&mut self, download_url: String) {
        self.image_download_url = Some(download_url);
    }

    /// Forgets the download URL after the uploaded object was removed again.
    pub fn image_removed(&mut self) {
        self.image_download_url = None;
    }

    /// Whether a document for this post has reached the store, by this or an
    /// earlier save, or because the post was loaded from it.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    pub fn document_stored(&mut self) {
        self.stored = true;
    }

    /// Drops the local image payload once it is safely persisted.
    pub fn discard_image(&mut self) -> Option<PostImage> {
        self.image.take()
    }

    #[must_use]
    pub fn likes(&self) -> &Likes {
        &self.likes
    }

    pub fn add_like(&mut self, user: User) -> bool {
        self.likes.insert(user)
    }

    pub fn replace_likes(&mut self, likes: Likes) {
        self.likes = likes;
    }

    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn replace_comments(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
    }
}
