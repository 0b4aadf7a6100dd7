use std::marker::PhantomData;

use mongodb::{
    bson::{self, DateTime, Document},
    options::{FindOptions, InsertManyOptions, InsertOneOptions, UpdateOptions},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::StoreError,
    repository::{
        store::{DeleteOutcome, DocumentStore, InsertManyOutcome, InsertOneOutcome, UpdateOutcome},
        update::{CREATED_AT, UPDATED_AT, UpdateDocument},
    },
};

/// A named collection of `T` that keeps `createdAt`/`updatedAt` current on
/// every write made through it.
#[derive(Debug, Clone)]
pub struct Collection<T, S> {
    name: String,
    store: S,
    _document: PhantomData<fn() -> T>,
}

fn stamped<T: Serialize>(doc: &T, now: DateTime) -> Result<Document, StoreError> {
    let mut doc = bson::to_document(doc)?;
    doc.insert(CREATED_AT, now);
    doc.insert(UPDATED_AT, now);
    Ok(doc)
}

impl<T, S> Collection<T, S>
where
    T: Serialize + DeserializeOwned,
    S: DocumentStore,
{
    pub fn new(store: S, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store,
            _document: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert_one(
        &self,
        doc: &T,
        options: impl Into<Option<InsertOneOptions>>,
    ) -> Result<InsertOneOutcome, StoreError> {
        let doc = stamped(doc, DateTime::now())?;
        tracing::debug!("Inserting one document into '{}'", self.name);
        self.store
            .insert_one(&self.name, doc, options.into())
            .await
    }

    /// Each document is stamped on its own, so they need not share a
    /// timestamp.
    pub async fn insert_many(
        &self,
        docs: impl IntoIterator<Item = T>,
        options: impl Into<Option<InsertManyOptions>>,
    ) -> Result<InsertManyOutcome, StoreError> {
        let docs = docs
            .into_iter()
            .map(|doc| stamped(&doc, DateTime::now()))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Inserting {} documents into '{}'", docs.len(), self.name);
        self.store
            .insert_many(&self.name, docs, options.into())
            .await
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateDocument>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<UpdateOutcome, StoreError> {
        let options = options.into();
        let update = Self::stamp_update(update.into(), options.as_ref());
        tracing::debug!("Updating one document in '{}'", self.name);
        self.store
            .update_one(&self.name, filter, update, options)
            .await
    }

    /// Same bookkeeping as [`Collection::update_one`], applied to every
    /// matching document.
    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<UpdateDocument>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<UpdateOutcome, StoreError> {
        let options = options.into();
        let update = Self::stamp_update(update.into(), options.as_ref());
        tracing::debug!("Updating many documents in '{}'", self.name);
        self.store
            .update_many(&self.name, filter, update, options)
            .await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        self.store
            .find_one(&self.name, filter)
            .await?
            .map(bson::from_document)
            .transpose()
            .map_err(Into::into)
    }

    pub async fn find(
        &self,
        filter: Document,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Vec<T>, StoreError> {
        self.store
            .find(&self.name, filter, options.into())
            .await?
            .into_iter()
            .map(|doc| bson::from_document(doc).map_err(Into::into))
            .collect()
    }

    pub async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome, StoreError> {
        tracing::debug!("Deleting one document from '{}'", self.name);
        self.store.delete_one(&self.name, filter).await
    }

    pub async fn count_documents(&self, filter: Document) -> Result<u64, StoreError> {
        self.store.count_documents(&self.name, filter).await
    }

    fn stamp_update(update: UpdateDocument, options: Option<&UpdateOptions>) -> Document {
        let upsert = options.and_then(|o| o.upsert).unwrap_or(false);
        update.stamped(upsert, DateTime::now()).into_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use mongodb::bson::{doc, oid::ObjectId};
    use serde::Deserialize;

    use crate::repository::MemoryStore;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Item {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        name: String,
        #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
        created_at: Option<DateTime>,
        #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<DateTime>,
    }

    fn item(name: &str) -> Item {
        Item {
            id: None,
            name: name.to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    fn items() -> Collection<Item, MemoryStore> {
        Collection::new(MemoryStore::new(), "items")
    }

    async fn tick() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn test_insert_one_stamps_both_timestamps() {
        let items = items();

        let outcome = items.insert_one(&item("a"), None).await.unwrap();
        let stored = items
            .find_one(doc! { "_id": outcome.inserted_id })
            .await
            .unwrap()
            .unwrap();

        assert!(stored.created_at.is_some());
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn test_insert_overrides_caller_timestamps() {
        let items = items();
        let mut stale = item("a");
        stale.created_at = Some(DateTime::from_millis(0));

        items.insert_one(&stale, None).await.unwrap();
        let stored = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        assert_ne!(stored.created_at, Some(DateTime::from_millis(0)));
    }

    #[tokio::test]
    async fn test_insert_many_stamps_each_document() {
        let items = items();

        let outcome = items
            .insert_many(vec![item("a"), item("b")], None)
            .await
            .unwrap();
        assert_eq!(outcome.inserted_ids.len(), 2);

        for stored in items.find(doc! {}, None).await.unwrap() {
            assert!(stored.created_at.is_some());
            assert_eq!(stored.created_at, stored.updated_at);
        }
    }

    #[tokio::test]
    async fn test_set_refreshes_updated_at_only() {
        let items = items();
        items.insert_one(&item("a"), None).await.unwrap();
        let before = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        tick().await;
        items
            .update_one(
                doc! { "name": "a" },
                UpdateDocument::new().set(doc! { "name": "b" }),
                None,
            )
            .await
            .unwrap();
        let after = items.find_one(doc! { "name": "b" }).await.unwrap().unwrap();

        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_raw_set_refreshes_updated_at() {
        let items = items();
        items.insert_one(&item("a"), None).await.unwrap();
        let before = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        tick().await;
        items
            .update_one(
                doc! { "name": "a" },
                UpdateDocument::new().raw("$set", doc! { "tag": "x" }),
                None,
            )
            .await
            .unwrap();
        let after = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_upsert_stamps_created_at_on_insert_branch() {
        let items = items();
        let upsert = UpdateOptions::builder().upsert(true).build();

        let outcome = items
            .update_one(
                doc! { "name": "a" },
                doc! { "$set": { "tag": "x" }, "$setOnInsert": { "origin": "upsert" } },
                upsert,
            )
            .await
            .unwrap();
        assert!(outcome.upserted_id.is_some());

        let stored = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();
        assert!(stored.created_at.is_some());
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn test_upsert_on_existing_keeps_timestamps() {
        let items = items();
        items.insert_one(&item("a"), None).await.unwrap();
        let before = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        tick().await;
        let outcome = items
            .update_one(
                doc! { "name": "a" },
                doc! { "$set": { "tag": "x" }, "$setOnInsert": { "origin": "upsert" } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 1);

        let after = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn test_update_without_set_leaves_timestamps() {
        let items = items();
        items.insert_one(&item("a"), None).await.unwrap();
        let before = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        tick().await;
        items
            .update_one(doc! { "name": "a" }, doc! { "$unset": { "tag": "" } }, None)
            .await
            .unwrap();
        let after = items.find_one(doc! { "name": "a" }).await.unwrap().unwrap();

        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn test_update_many_stamps_every_match() {
        let items = items();
        items
            .insert_many(vec![item("a"), item("a"), item("c")], None)
            .await
            .unwrap();

        tick().await;
        let outcome = items
            .update_many(doc! { "name": "a" }, doc! { "$set": { "name": "b" } }, None)
            .await
            .unwrap();
        assert_eq!(outcome.modified_count, 2);

        let updated = items.find(doc! { "name": "b" }, None).await.unwrap();
        assert_eq!(updated.len(), 2);
        for stored in updated {
            assert!(stored.updated_at > stored.created_at);
        }
    }
}
