mod error;
pub mod mime;
pub mod projection;
mod service;

pub use error::FileError;
pub use service::{AddedFile, FileService, FileUpload, ListFiles};
