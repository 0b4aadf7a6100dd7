use mongodb::bson::doc;

use crate::{
    dto::{CreateNoteRequest, NoteListQuery, SerializedNote},
    error::StoreError,
    models::NoteDocument,
    repository::{Collection, DocumentStore, IntoObjectId, id_to_string},
};

pub const NOTES_COLLECTION: &str = "notes";

#[derive(Clone)]
pub struct NoteService<S> {
    notes: Collection<NoteDocument, S>,
}

impl<S: DocumentStore> NoteService<S> {
    pub fn new(store: S) -> Self {
        Self {
            notes: Collection::new(store, NOTES_COLLECTION),
        }
    }

    /// Returns `None` when no note has this id; a malformed id is an error.
    pub async fn get_note(
        &self,
        id: impl IntoObjectId,
    ) -> Result<Option<SerializedNote>, StoreError> {
        let id = id.into_object_id()?;
        Ok(self
            .notes
            .find_one(doc! { "_id": id })
            .await?
            .map(SerializedNote::from))
    }

    /// All notes owned by `query.user_id`, in the store's natural order.
    pub async fn get_note_list_items(
        &self,
        query: NoteListQuery,
    ) -> Result<Vec<SerializedNote>, StoreError> {
        let user_id = query.user_id.into_object_id()?;
        let notes = self.notes.find(doc! { "userId": user_id }, None).await?;
        Ok(notes.into_iter().map(SerializedNote::from).collect())
    }

    pub async fn create_note(&self, request: CreateNoteRequest) -> Result<String, StoreError> {
        let user_id = request.user_id.into_object_id()?;
        let note = NoteDocument::new(request.title, request.body, user_id);

        let outcome = self.notes.insert_one(&note, None).await?;
        let id = id_to_string(&outcome.inserted_id);
        tracing::debug!("Created note {id} for user {user_id}");

        Ok(id)
    }

    pub async fn delete_note(&self, id: impl IntoObjectId) -> Result<(), StoreError> {
        let id = id.into_object_id()?;
        self.notes.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }
}
