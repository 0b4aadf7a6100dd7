use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NoteDocument, UserDocument};

/// A note as handed to callers: ids rendered as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNote {
    pub id: String,
    pub title: String,
    pub body: String,
    pub user_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<NoteDocument> for SerializedNote {
    fn from(note: NoteDocument) -> Self {
        Self {
            id: note.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: note.title,
            body: note.body,
            user_id: note.user_id.to_hex(),
            created_at: note.created_at.map(|t| t.to_chrono()),
            updated_at: note.updated_at.map(|t| t.to_chrono()),
        }
    }
}

/// A user as handed to callers. The password hash is never carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedUser {
    pub id: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserDocument> for SerializedUser {
    fn from(user: UserDocument) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email,
            created_at: user.created_at.map(|t| t.to_chrono()),
            updated_at: user.updated_at.map(|t| t.to_chrono()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
    /// Owner id as a hex string.
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteListQuery {
    pub user_id: String,
}
