use crate::model::Id;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub handle: UserHandle,
    pub full_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateUser {
    pub handle: UserHandle,
    pub full_name: String,
}

/// The name a user is shown under. Stored records may carry any string here,
/// including an empty one.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserHandle(String);

impl User {
    #[must_use]
    pub fn new(id: Id<UserMarker>, create: CreateUser) -> Self {
        Self {
            id,
            handle: create.handle,
            full_name: create.full_name,
        }
    }
}

impl UserHandle {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for UserHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}
