use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use mongodb::{
    bson::{Bson, Document, oid::ObjectId},
    options::{FindOptions, InsertManyOptions, InsertOneOptions, UpdateOptions},
};

use crate::{
    error::StoreError,
    repository::store::{
        DeleteOutcome, DocumentStore, InsertManyOutcome, InsertOneOutcome, UpdateOutcome,
    },
};

const ID: &str = "_id";

/// In-memory [`DocumentStore`] for tests and local runs.
///
/// Filters are top-level equality matches; updates understand `$set`,
/// `$setOnInsert` and `$unset`. Documents keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: Option<UpdateOptions>,
        multi: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        check_filter(filter)?;
        check_update(update)?;

        let upsert = options.and_then(|o| o.upsert).unwrap_or(false);
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();

        let mut matched_count = 0;
        let mut modified_count = 0;

        for doc in docs.iter_mut().filter(|doc| matches(doc, filter)) {
            matched_count += 1;
            if apply_update(doc, update, false) {
                modified_count += 1;
            }
            if !multi {
                break;
            }
        }

        let mut upserted_id = None;
        if matched_count == 0 && upsert {
            let mut doc: Document = filter
                .iter()
                .filter(|(key, _)| !key.starts_with('$'))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            apply_update(&mut doc, update, true);
            let id = ensure_id(&mut doc);
            docs.push(doc);
            upserted_id = Some(id);
        }

        Ok(UpdateOutcome {
            matched_count,
            modified_count,
            upserted_id,
        })
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

fn check_filter(filter: &Document) -> Result<(), StoreError> {
    for (key, value) in filter {
        let has_operator = match value {
            Bson::Document(inner) => inner.keys().any(|k| k.starts_with('$')),
            _ => false,
        };
        if key.starts_with('$') || has_operator {
            return Err(StoreError::Unsupported(format!(
                "filter on '{key}' is not an equality match"
            )));
        }
    }
    Ok(())
}

fn check_update(update: &Document) -> Result<(), StoreError> {
    for (operator, value) in update {
        match (operator.as_str(), value) {
            ("$set" | "$setOnInsert" | "$unset", Bson::Document(_)) => {}
            _ => {
                return Err(StoreError::Unsupported(format!(
                    "update operator '{operator}'"
                )));
            }
        }
    }
    Ok(())
}

/// Returns whether the document changed.
fn apply_update(doc: &mut Document, update: &Document, inserting: bool) -> bool {
    let before = doc.clone();

    for (operator, value) in update {
        let Bson::Document(fields) = value else {
            continue;
        };
        match operator.as_str() {
            "$set" => {
                for (key, value) in fields {
                    doc.insert(key.clone(), value.clone());
                }
            }
            "$setOnInsert" if inserting => {
                for (key, value) in fields {
                    doc.insert(key.clone(), value.clone());
                }
            }
            "$unset" => {
                for key in fields.keys() {
                    doc.remove(key);
                }
            }
            _ => {}
        }
    }

    *doc != before
}

fn ensure_id(doc: &mut Document) -> Bson {
    if let Some(id) = doc.get(ID) {
        return id.clone();
    }
    let id = Bson::ObjectId(ObjectId::new());
    doc.insert(ID, id.clone());
    id
}

fn insert_into(docs: &mut Vec<Document>, mut doc: Document) -> Result<Bson, StoreError> {
    let id = ensure_id(&mut doc);
    if docs.iter().any(|existing| existing.get(ID) == Some(&id)) {
        return Err(StoreError::DuplicateKey(format!("{ID}: {id}")));
    }
    docs.push(doc);
    Ok(id)
}

impl DocumentStore for MemoryStore {
    async fn insert_one(
        &self,
        collection: &str,
        doc: Document,
        _options: Option<InsertOneOptions>,
    ) -> Result<InsertOneOutcome, StoreError> {
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        let inserted_id = insert_into(docs, doc)?;
        Ok(InsertOneOutcome { inserted_id })
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
        _options: Option<InsertManyOptions>,
    ) -> Result<InsertManyOutcome, StoreError> {
        let mut collections = self.lock();
        let existing = collections.entry(collection.to_string()).or_default();

        let mut inserted_ids = HashMap::new();
        for (index, doc) in docs.into_iter().enumerate() {
            inserted_ids.insert(index, insert_into(existing, doc)?);
        }

        Ok(InsertManyOutcome { inserted_ids })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.update(collection, &filter, &update, options, false)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.update(collection, &filter, &update, options, true)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        check_filter(&filter)?;
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<Document>, StoreError> {
        check_filter(&filter)?;

        let (skip, limit) = options.map_or((None, None), |o| (o.skip, o.limit));
        let skip = usize::try_from(skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = limit
            .filter(|l| *l != 0)
            .map_or(usize::MAX, |l| usize::try_from(l.unsigned_abs()).unwrap_or(usize::MAX));

        Ok(self
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(doc, &filter))
                    .skip(skip)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, StoreError> {
        check_filter(&filter)?;

        let mut collections = self.lock();
        let deleted_count = match collections.get_mut(collection) {
            Some(docs) => match docs.iter().position(|doc| matches(doc, &filter)) {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };

        Ok(DeleteOutcome { deleted_count })
    }

    async fn count_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<u64, StoreError> {
        check_filter(&filter)?;
        Ok(self.lock().get(collection).map_or(0, |docs| {
            docs.iter().filter(|doc| matches(doc, &filter)).count() as u64
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::bson::doc;

    const NOTES: &str = "notes";

    fn upsert() -> Option<UpdateOptions> {
        Some(UpdateOptions::builder().upsert(true).build())
    }

    #[tokio::test]
    async fn test_insert_generates_id() {
        let store = MemoryStore::new();

        let outcome = store
            .insert_one(NOTES, doc! { "title": "a" }, None)
            .await
            .unwrap();
        assert!(matches!(outcome.inserted_id, Bson::ObjectId(_)));

        let found = store
            .find_one(NOTES, doc! { "_id": outcome.inserted_id.clone() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("title").unwrap(), "a");
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let id = ObjectId::new();

        store
            .insert_one(NOTES, doc! { "_id": id, "title": "a" }, None)
            .await
            .unwrap();
        let err = store
            .insert_one(NOTES, doc! { "_id": id, "title": "b" }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_insert_many_reports_positions() {
        let store = MemoryStore::new();

        let outcome = store
            .insert_many(NOTES, vec![doc! { "n": 0 }, doc! { "n": 1 }], None)
            .await
            .unwrap();
        assert_eq!(outcome.inserted_ids.len(), 2);

        let second = store
            .find_one(NOTES, doc! { "_id": outcome.inserted_ids[&1].clone() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.get_i32("n").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_one_touches_first_match() {
        let store = MemoryStore::new();
        store
            .insert_many(NOTES, vec![doc! { "k": 1 }, doc! { "k": 1 }], None)
            .await
            .unwrap();

        let outcome = store
            .update_one(NOTES, doc! { "k": 1 }, doc! { "$set": { "v": true } }, None)
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 1);
        assert_eq!(
            store.count_documents(NOTES, doc! { "v": true }).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_many_touches_all_matches() {
        let store = MemoryStore::new();
        store
            .insert_many(NOTES, vec![doc! { "k": 1 }, doc! { "k": 1 }, doc! { "k": 2 }], None)
            .await
            .unwrap();

        let outcome = store
            .update_many(NOTES, doc! { "k": 1 }, doc! { "$set": { "v": true } }, None)
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 2);
        assert_eq!(
            store.count_documents(NOTES, doc! { "v": true }).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_upsert_inserts_with_filter_and_set_on_insert() {
        let store = MemoryStore::new();

        let outcome = store
            .update_one(
                NOTES,
                doc! { "slug": "x" },
                doc! { "$set": { "title": "a" }, "$setOnInsert": { "body": "b" } },
                upsert(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 0);
        assert!(outcome.upserted_id.is_some());

        let doc = store
            .find_one(NOTES, doc! { "slug": "x" })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_str("title").unwrap(), "a");
        assert_eq!(doc.get_str("body").unwrap(), "b");
    }

    #[tokio::test]
    async fn test_set_on_insert_skipped_on_match() {
        let store = MemoryStore::new();
        store
            .insert_one(NOTES, doc! { "slug": "x", "body": "old" }, None)
            .await
            .unwrap();

        store
            .update_one(
                NOTES,
                doc! { "slug": "x" },
                doc! { "$set": { "title": "a" }, "$setOnInsert": { "body": "new" } },
                upsert(),
            )
            .await
            .unwrap();

        let doc = store
            .find_one(NOTES, doc! { "slug": "x" })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_str("body").unwrap(), "old");
        assert_eq!(doc.get_str("title").unwrap(), "a");
    }

    #[tokio::test]
    async fn test_unsupported_operator_leaves_data_alone() {
        let store = MemoryStore::new();
        store
            .insert_one(NOTES, doc! { "k": 1 }, None)
            .await
            .unwrap();

        let err = store
            .update_one(NOTES, doc! { "k": 1 }, doc! { "$inc": { "k": 1 } }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(_)));
        assert_eq!(store.count_documents(NOTES, doc! { "k": 1 }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_honours_skip_and_limit() {
        let store = MemoryStore::new();
        let docs = (0..5).map(|n| doc! { "n": n }).collect();
        store.insert_many(NOTES, docs, None).await.unwrap();

        let options = FindOptions::builder().skip(1_u64).limit(2_i64).build();
        let found = store.find(NOTES, doc! {}, Some(options)).await.unwrap();
        let ns: Vec<i32> = found.iter().map(|d| d.get_i32("n").unwrap()).collect();
        assert_eq!(ns, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = MemoryStore::new();

        let outcome = store
            .delete_one(NOTES, doc! { "_id": ObjectId::new() })
            .await
            .unwrap();
        assert_eq!(outcome.deleted_count, 0);
    }
}
