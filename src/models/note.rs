use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A note as stored in the `notes` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub body: String,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl NoteDocument {
    pub fn new(title: String, body: String, user_id: ObjectId) -> Self {
        Self {
            id: None,
            title,
            body,
            user_id,
            created_at: None,
            updated_at: None,
        }
    }
}
