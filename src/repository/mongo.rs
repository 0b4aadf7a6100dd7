use futures_util::TryStreamExt;
use mongodb::{
    Client,
    bson::Document,
    options::{ClientOptions, FindOptions, InsertManyOptions, InsertOneOptions, UpdateOptions},
};

use crate::{
    config::Config,
    error::StoreError,
    repository::store::{
        DeleteOutcome, DocumentStore, InsertManyOutcome, InsertOneOutcome, UpdateOutcome,
    },
};

/// The process-wide connection to the document store.
///
/// Build one at startup and hand [`Database::store`] to every repository.
/// [`Database::close`] consumes the handle, so the client is shut down once.
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(config.connection_uri()).await?;
        let client = Client::with_options(options)?;

        tracing::info!("MongoDB client created for database '{}'", config.database);

        Ok(Self {
            client,
            name: config.database.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> MongoStore {
        MongoStore {
            db: self.client.database(&self.name),
        }
    }

    /// Drops the whole database. Meant for disposable test databases.
    pub async fn drop_database(&self) -> Result<(), StoreError> {
        tracing::info!("Dropping database '{}'", self.name);
        self.client.database(&self.name).drop(None).await?;
        Ok(())
    }

    pub async fn close(self) {
        tracing::info!("MongoDB client disconnecting");
        self.client.shutdown().await;
    }
}

/// [`DocumentStore`] backed by the MongoDB driver.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: mongodb::Database,
}

impl MongoStore {
    pub const fn new(db: mongodb::Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

impl DocumentStore for MongoStore {
    async fn insert_one(
        &self,
        collection: &str,
        doc: Document,
        options: Option<InsertOneOptions>,
    ) -> Result<InsertOneOutcome, StoreError> {
        let result = self.collection(collection).insert_one(doc, options).await?;
        Ok(result.into())
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> Result<InsertManyOutcome, StoreError> {
        let result = self
            .collection(collection)
            .insert_many(docs, options)
            .await?;
        Ok(result.into())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, update, options)
            .await?;
        Ok(result.into())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_many(filter, update, options)
            .await?;
        Ok(result.into())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).find_one(filter, None).await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(filter, options).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, StoreError> {
        let result = self.collection(collection).delete_one(filter, None).await?;
        Ok(result.into())
    }

    async fn count_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<u64, StoreError> {
        Ok(self
            .collection(collection)
            .count_documents(filter, None)
            .await?)
    }
}
