mod collection;
mod memory;
mod mongo;
mod store;
mod update;

pub use collection::Collection;
pub use memory::MemoryStore;
pub use mongo::{Database, MongoStore};
pub use store::{
    DeleteOutcome, DocumentStore, InsertManyOutcome, InsertOneOutcome, IntoObjectId,
    UpdateOutcome, id_to_string,
};
pub use update::{CREATED_AT, UPDATED_AT, UpdateDocument, UpdateOperation};
