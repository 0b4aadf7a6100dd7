mod note;
mod user;

pub use note::{NOTES_COLLECTION, NoteService};
pub use user::{BCRYPT_COST, USERS_COLLECTION, UserService};
