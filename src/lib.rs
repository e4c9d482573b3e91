pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{S3Options, UploaderConfig};
pub use error::KeyError;
pub use models::{FileId, KeyNameOutcome, KeyNaming, Transport};
pub use services::engine::{BasicEngine, UploadEngine, UploadHandler};
pub use services::key_registry::KeyRegistry;
pub use services::key_resolver::{KeyResolution, KeyResolver};
pub use services::uploader::{HandlerOptions, KeyNameCallback, S3HandlerOptions, S3Uploader};
