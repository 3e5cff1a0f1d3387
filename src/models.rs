use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{Document, DocumentId, Fields, StoreError};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<DocumentId> for $name {
            fn from(id: DocumentId) -> Self {
                Self(id.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

id_type!(UserId);
id_type!(GroupId);
id_type!(MessageId);

/// Milliseconds since the Unix epoch, as stamped by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self((OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64)
    }

    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * 1_000_000).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Group {
    #[serde(skip)]
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub creator: UserId,
}

impl Group {
    pub fn from_document(doc: &Document) -> Result<Self, StoreError> {
        Ok(Self {
            id: doc.id.clone().into(),
            ..doc.decode::<Self>()?
        })
    }

    pub fn fields(name: &str, description: &str, creator: &UserId) -> Fields {
        Fields::new()
            .set("name", name)
            .set("description", description)
            .set("creator", creator.0.as_str())
    }
}

pub const DELETED_PLACEHOLDER: &str = "Message deleted";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip)]
    pub id: MessageId,
    #[serde(skip)]
    pub group_id: GroupId,
    #[serde(rename = "message")]
    pub body: String,
    pub sender: UserId,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Message {
    pub const CREATED_AT: &'static str = "createdAt";

    pub fn from_document(group_id: &GroupId, doc: &Document) -> Result<Self, StoreError> {
        Ok(Self {
            id: doc.id.clone().into(),
            group_id: group_id.clone(),
            ..doc.decode::<Self>()?
        })
    }

    pub fn fields(body: &str, sender: &UserId) -> Fields {
        Fields::new()
            .set("message", body)
            .set("sender", sender.0.as_str())
            .server_timestamp(Self::CREATED_AT)
    }

    /// Body rewrite and flag for a soft delete. Identity and timestamp stay.
    pub fn soft_delete() -> Fields {
        Fields::new()
            .set("message", DELETED_PLACEHOLDER)
            .set("isDeleted", true)
    }

    pub fn display_body(&self) -> &str {
        if self.is_deleted {
            DELETED_PLACEHOLDER
        } else {
            &self.body
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    pub fn fields(&self) -> Fields {
        Fields::new()
            .set("username", self.username.as_str())
            .set("email", self.email.as_str())
    }
}
