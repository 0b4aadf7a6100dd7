mod note;
mod user;

pub use note::NoteDocument;
pub use user::UserDocument;
