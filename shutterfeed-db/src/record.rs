use crate::store::Document;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use shutterfeed_common::{
    model::{
        Id, ModelValidationError,
        comment::Comment,
        post::{Post, PostKind, PostMarker},
        user::{User, UserHandle},
    },
    util::Timestamp,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedRecordError {
    #[error("Malformed {entity} record: {source}")]
    Shape {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid {entity} record: {source}")]
    Invalid {
        entity: &'static str,
        #[source]
        source: ModelValidationError,
    },
}

impl MalformedRecordError {
    #[must_use]
    pub fn entity(&self) -> &'static str {
        match self {
            MalformedRecordError::Shape { entity, .. }
            | MalformedRecordError::Invalid { entity, .. } => entity,
        }
    }
}

/// Scalars that are missing or of the wrong type fall back to their defaults.
mod lenient {
    use super::{Deserialize, Deserializer, Value};

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(string) => string,
            _ => String::new(),
        })
    }

    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?
            .as_f64()
            .unwrap_or_default())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub uid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub full_name: String,
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub uid: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub caption: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub created_at: f64,
    pub created_by: UserRecord,
    #[serde(
        rename = "imageDownloadURL",
        default,
        deserialize_with = "lenient::string"
    )]
    pub image_download_url: String,
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub uid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub created_at: f64,
    pub created_by: UserRecord,
}

impl From<&User> for UserRecord {
    fn from(value: &User) -> Self {
        Self {
            uid: value.id.to_string(),
            username: value.handle.get().to_owned(),
            full_name: value.full_name.clone(),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::new(value.uid)?,
            handle: UserHandle::new(value.username),
            full_name: value.full_name,
        })
    }
}

impl From<&Post> for PostRecord {
    fn from(value: &Post) -> Self {
        Self {
            uid: value.id.to_string(),
            kind: value.kind.as_str().to_owned(),
            caption: value.caption.clone(),
            created_at: value.created_at().unix_seconds(),
            created_by: UserRecord::from(&value.author),
            image_download_url: value.image_download_url().unwrap_or_default().to_owned(),
        }
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        let image_download_url =
            (!value.image_download_url.is_empty()).then_some(value.image_download_url);

        Ok(Post::restore(
            Id::new(value.uid)?,
            PostKind::from(value.kind),
            value.caption,
            Timestamp::from_unix_seconds(value.created_at),
            value.created_by.try_into()?,
            image_download_url,
        ))
    }
}

impl From<&Comment> for CommentRecord {
    fn from(value: &Comment) -> Self {
        Self {
            uid: value.id.to_string(),
            text: value.text.clone(),
            created_at: value.created_at.unix_seconds(),
            created_by: UserRecord::from(&value.author),
        }
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::new(value.uid)?,
            author: value.created_by.try_into()?,
            text: value.text,
            created_at: Timestamp::from_unix_seconds(value.created_at),
        })
    }
}

impl From<UserRecord> for Document {
    fn from(value: UserRecord) -> Self {
        let mut document = Document::new();
        document.insert("uid".to_owned(), value.uid.into());
        document.insert("username".to_owned(), value.username.into());
        document.insert("fullName".to_owned(), value.full_name.into());
        document
    }
}

impl From<PostRecord> for Document {
    fn from(value: PostRecord) -> Self {
        let mut document = Document::new();
        document.insert("uid".to_owned(), value.uid.into());
        document.insert("type".to_owned(), value.kind.into());
        document.insert("caption".to_owned(), value.caption.into());
        document.insert("createdAt".to_owned(), value.created_at.into());
        document.insert(
            "createdBy".to_owned(),
            Value::Object(value.created_by.into()),
        );
        document.insert(
            "imageDownloadURL".to_owned(),
            value.image_download_url.into(),
        );
        document
    }
}

impl From<CommentRecord> for Document {
    fn from(value: CommentRecord) -> Self {
        let mut document = Document::new();
        document.insert("uid".to_owned(), value.uid.into());
        document.insert("text".to_owned(), value.text.into());
        document.insert("createdAt".to_owned(), value.created_at.into());
        document.insert(
            "createdBy".to_owned(),
            Value::Object(value.created_by.into()),
        );
        document
    }
}

fn decode<R, T>(entity: &'static str, document: Document) -> Result<T, MalformedRecordError>
where
    R: for<'de> Deserialize<'de>,
    T: TryFrom<R, Error = ModelValidationError>,
{
    let record: R = serde_json::from_value(Value::Object(document))
        .map_err(|source| MalformedRecordError::Shape { entity, source })?;
    T::try_from(record).map_err(|source| MalformedRecordError::Invalid { entity, source })
}

#[must_use]
pub fn encode_user(user: &User) -> Document {
    UserRecord::from(user).into()
}

pub fn decode_user(document: Document) -> Result<User, MalformedRecordError> {
    decode::<UserRecord, _>("user", document)
}

/// The persisted subset of a post. Likes, comments and the local image payload
/// are never part of it.
#[must_use]
pub fn encode_post(post: &Post) -> Document {
    PostRecord::from(post).into()
}

pub fn decode_post(document: Document) -> Result<Post, MalformedRecordError> {
    decode::<PostRecord, _>("post", document)
}

/// Decodes a post read from `post_id`, using that key when the record carries
/// no usable `uid` of its own.
pub fn decode_post_at(
    post_id: &Id<PostMarker>,
    mut document: Document,
) -> Result<Post, MalformedRecordError> {
    let has_uid = matches!(document.get("uid"), Some(Value::String(uid)) if !uid.is_empty());
    if !has_uid {
        document.insert("uid".to_owned(), post_id.as_str().into());
    }
    decode_post(document)
}

#[must_use]
pub fn encode_comment(comment: &Comment) -> Document {
    CommentRecord::from(comment).into()
}

pub fn decode_comment(document: Document) -> Result<Comment, MalformedRecordError> {
    decode::<CommentRecord, _>("comment", document)
}
