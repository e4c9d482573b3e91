use crate::error::KeyError;
use crate::models::{FileId, Transport};
use crate::services::key_resolver::KeyResolution;
use crate::services::uploader::HandlerOptions;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// The parts of a generic upload engine the S3 uploader builds on.
pub trait UploadEngine: Send + Sync + 'static {
    type Handler;

    /// Unique identifier the engine assigned to a tracked file.
    fn uuid(&self, id: FileId) -> Option<String>;

    /// Builds the handler performing uploads over `transport`.
    fn create_upload_handler(&self, options: HandlerOptions, transport: Transport) -> Self::Handler;

    /// Forgets every tracked file and in-flight upload.
    /// Runs while the uploader's registry is locked, so it must not call back into it.
    fn reset(&self);
}

#[derive(Debug, Clone)]
struct TrackedFile {
    uuid: Uuid,
    name: String,
}

/// In-memory engine that tracks file identities and hands out handlers.
#[derive(Debug, Default)]
pub struct BasicEngine {
    files: Arc<DashMap<FileId, TrackedFile>>,
    next_id: AtomicU64,
}

impl BasicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a file and assigns it an id and a uuid.
    pub fn add_file(&self, name: impl Into<String>) -> FileId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.files.insert(
            id,
            TrackedFile {
                uuid: Uuid::new_v4(),
                name: name.into(),
            },
        );
        id
    }

    pub fn name(&self, id: FileId) -> Option<String> {
        self.files.get(&id).map(|file| file.name.clone())
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self.files.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl UploadEngine for BasicEngine {
    type Handler = UploadHandler;

    fn uuid(&self, id: FileId) -> Option<String> {
        self.files.get(&id).map(|file| file.uuid.to_string())
    }

    fn create_upload_handler(&self, options: HandlerOptions, transport: Transport) -> UploadHandler {
        tracing::debug!("Creating {:?} upload handler", transport);
        UploadHandler {
            options,
            transport,
            files: Arc::clone(&self.files),
        }
    }

    fn reset(&self) {
        self.files.clear();
        self.next_id.store(0, Ordering::SeqCst);
    }
}

/// Handler built by [`BasicEngine`]. It sees the engine's live file table.
#[derive(Debug)]
pub struct UploadHandler {
    options: HandlerOptions,
    transport: Transport,
    files: Arc<DashMap<FileId, TrackedFile>>,
}

impl UploadHandler {
    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Asks for the key of `id` as its upload is about to begin.
    pub fn key_name(&self, id: FileId) -> KeyResolution {
        let Some(name) = self.files.get(&id).map(|file| file.name.clone()) else {
            return KeyResolution::failed(KeyError::UnknownFile { id });
        };
        self.options.s3.key_name(id, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::S3Options;
    use crate::services::uploader::S3HandlerOptions;

    #[test]
    fn test_add_file_assigns_sequential_ids() {
        let engine = BasicEngine::new();
        assert_eq!(engine.add_file("a.txt"), 0);
        assert_eq!(engine.add_file("b.txt"), 1);
        assert_eq!(engine.file_ids(), vec![0, 1]);
        assert_eq!(engine.name(1).as_deref(), Some("b.txt"));
    }

    #[test]
    fn test_uuids_are_distinct() {
        let engine = BasicEngine::new();
        let a = engine.add_file("a.txt");
        let b = engine.add_file("a.txt");
        let uuid_a = engine.uuid(a).unwrap();
        assert!(Uuid::parse_str(&uuid_a).is_ok());
        assert_ne!(Some(uuid_a), engine.uuid(b));
        assert!(engine.uuid(99).is_none());
    }

    #[test]
    fn test_handler_reports_requested_transport() {
        let engine = BasicEngine::new();
        let options = HandlerOptions {
            s3: S3HandlerOptions::new(
                &S3Options::default(),
                Arc::new(|id: FileId, _: &str| KeyResolution::failed(KeyError::UnknownFile { id })),
            ),
        };
        let handler = engine.create_upload_handler(options, Transport::Traditional);
        assert_eq!(handler.transport(), Transport::Traditional);
    }

    #[test]
    fn test_reset_clears_files_and_ids() {
        let engine = BasicEngine::new();
        engine.add_file("a.txt");
        engine.add_file("b.txt");
        engine.reset();
        assert!(engine.is_empty());
        assert_eq!(engine.add_file("c.txt"), 0);
        assert_eq!(engine.len(), 1);
    }
}
