use mongodb::bson::doc;

use crate::{
    dto::SerializedUser,
    error::StoreError,
    models::UserDocument,
    repository::{Collection, DeleteOutcome, DocumentStore, IntoObjectId, id_to_string},
};

pub const USERS_COLLECTION: &str = "users";
pub const BCRYPT_COST: u32 = 10;

#[derive(Clone)]
pub struct UserService<S> {
    users: Collection<UserDocument, S>,
}

impl<S: DocumentStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self {
            users: Collection::new(store, USERS_COLLECTION),
        }
    }

    /// Cheap round trip used by health checks.
    pub async fn get_user_count(&self) -> Result<u64, StoreError> {
        self.users.count_documents(doc! {}).await
    }

    pub async fn get_user_by_id(
        &self,
        id: impl IntoObjectId,
    ) -> Result<Option<SerializedUser>, StoreError> {
        let id = id.into_object_id()?;
        Ok(self
            .users
            .find_one(doc! { "_id": id })
            .await?
            .map(SerializedUser::from))
    }

    pub async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<SerializedUser>, StoreError> {
        Ok(self
            .users
            .find_one(doc! { "email": email })
            .await?
            .map(SerializedUser::from))
    }

    /// Stores a new user with a bcrypt hash of `password`. Existing users
    /// with the same email are not checked for.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<String, StoreError> {
        let password = password.to_owned();
        let hashed =
            tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST)).await??;

        let user = UserDocument {
            id: None,
            email: email.to_owned(),
            password: hashed,
            created_at: None,
            updated_at: None,
        };

        let outcome = self.users.insert_one(&user, None).await?;
        let id = id_to_string(&outcome.inserted_id);
        tracing::info!("Created user {id}");

        Ok(id)
    }

    pub async fn delete_user_by_email(&self, email: &str) -> Result<DeleteOutcome, StoreError> {
        self.users.delete_one(doc! { "email": email }).await
    }

    /// Returns the user only when `password` matches the stored hash. An
    /// unknown email and a wrong password both yield `None`.
    pub async fn verify_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<SerializedUser>, StoreError> {
        let Some(user) = self.users.find_one(doc! { "email": email }).await? else {
            return Ok(None);
        };

        let password = password.to_owned();
        let hash = user.password.clone();
        let verified =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;

        match verified {
            Ok(true) => Ok(Some(SerializedUser::from(user))),
            Ok(false) => Ok(None),
            Err(e) => {
                let id = user.id.map(|id| id.to_hex()).unwrap_or_default();
                tracing::warn!("Stored password hash for user {id} is unreadable: {e}");
                Ok(None)
            }
        }
    }
}
