use crate::{
    model::{Id, user::User},
    util::Timestamp,
};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, PartialEq, Debug)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub author: User,
    pub text: String,
    pub created_at: Timestamp,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub author: User,
    pub text: String,
}

impl Comment {
    #[must_use]
    pub fn new(id: Id<CommentMarker>, create: CreateComment) -> Self {
        Self {
            id,
            author: create.author,
            text: create.text,
            created_at: Timestamp::now(),
        }
    }
}
