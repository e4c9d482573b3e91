pub mod engine;
pub mod key_registry;
pub mod key_resolver;
pub mod uploader;
