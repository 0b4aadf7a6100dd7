//! Timestamped persistence for users and notes on top of MongoDB.
//!
//! Open one [`Database`] at startup and pass its store to the services:
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use notes_store::{Config, Database, NoteService, UserService};
//!
//! let config = Config::from_env()?;
//! let db = Database::connect(&config).await?;
//!
//! let users = UserService::new(db.store());
//! let notes = NoteService::new(db.store());
//!
//! let user_id = users.create_user("a@b.com", "secret").await?;
//! # let _ = (user_id, notes);
//! db.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Every write made through [`Collection`] carries `createdAt` and
//! `updatedAt`. Lookups that find nothing return `Ok(None)`.

pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use config::Config;
pub use dto::{CreateNoteRequest, NoteListQuery, SerializedNote, SerializedUser};
pub use error::{ConfigError, StoreError};
pub use repository::{
    Collection, Database, DocumentStore, MemoryStore, MongoStore, UpdateDocument,
    UpdateOperation,
};
pub use service::{NoteService, UserService};
