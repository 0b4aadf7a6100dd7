use std::{collections::HashMap, future::Future};

use mongodb::{
    bson::{Bson, Document, oid::ObjectId},
    options::{FindOptions, InsertManyOptions, InsertOneOptions, UpdateOptions},
    results::{DeleteResult, InsertManyResult, InsertOneResult, UpdateResult},
};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneOutcome {
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyOutcome {
    /// Generated ids keyed by the position of the document in the input.
    pub inserted_ids: HashMap<usize, Bson>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

impl From<InsertOneResult> for InsertOneOutcome {
    fn from(result: InsertOneResult) -> Self {
        Self {
            inserted_id: result.inserted_id,
        }
    }
}

impl From<InsertManyResult> for InsertManyOutcome {
    fn from(result: InsertManyResult) -> Self {
        Self {
            inserted_ids: result.inserted_ids,
        }
    }
}

impl From<UpdateResult> for UpdateOutcome {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}

impl From<DeleteResult> for DeleteOutcome {
    fn from(result: DeleteResult) -> Self {
        Self {
            deleted_count: result.deleted_count,
        }
    }
}

/// Raw document operations against a named collection.
///
/// Implementations pass errors through untouched; callers get exactly what
/// the backend raised.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    fn insert_one(
        &self,
        collection: &str,
        doc: Document,
        options: Option<InsertOneOptions>,
    ) -> impl Future<Output = Result<InsertOneOutcome, StoreError>> + Send;

    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> impl Future<Output = Result<InsertManyOutcome, StoreError>> + Send;

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> impl Future<Output = Result<UpdateOutcome, StoreError>> + Send;

    fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> impl Future<Output = Result<UpdateOutcome, StoreError>> + Send;

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = Result<DeleteOutcome, StoreError>> + Send;

    fn count_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Anything a caller may hand in as a document id.
pub trait IntoObjectId {
    fn into_object_id(self) -> Result<ObjectId, StoreError>;
}

impl IntoObjectId for ObjectId {
    fn into_object_id(self) -> Result<ObjectId, StoreError> {
        Ok(self)
    }
}

impl IntoObjectId for &ObjectId {
    fn into_object_id(self) -> Result<ObjectId, StoreError> {
        Ok(*self)
    }
}

impl IntoObjectId for &str {
    fn into_object_id(self) -> Result<ObjectId, StoreError> {
        Ok(ObjectId::parse_str(self)?)
    }
}

impl IntoObjectId for String {
    fn into_object_id(self) -> Result<ObjectId, StoreError> {
        self.as_str().into_object_id()
    }
}

impl IntoObjectId for &String {
    fn into_object_id(self) -> Result<ObjectId, StoreError> {
        self.as_str().into_object_id()
    }
}

/// Renders an inserted id the way callers receive it.
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
