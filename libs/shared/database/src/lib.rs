pub mod collection;
pub mod error;
pub mod json_file;

pub use collection::Collection;
pub use error::DatabaseError;
pub use json_file::JsonFile;
