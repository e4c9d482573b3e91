use crate::config::{S3Options, UploaderConfig};
use crate::models::{FileId, KeyNaming, Transport};
use crate::services::engine::UploadEngine;
use crate::services::key_registry::KeyRegistry;
use crate::services::key_resolver::{KeyResolution, KeyResolver};
use std::fmt;
use std::sync::Arc;

/// Callback a handler invokes with `(id, filename)` to learn a file's key.
/// The returned resolution must be awaited for a deferred key to reach the registry.
pub type KeyNameCallback = Arc<dyn Fn(FileId, &str) -> KeyResolution + Send + Sync>;

/// Options passed to the engine when it builds a handler.
#[derive(Clone, Debug)]
pub struct HandlerOptions {
    pub s3: S3HandlerOptions,
}

/// S3 options as seen by the handler: the configured values plus the key-name callback.
#[derive(Clone)]
pub struct S3HandlerOptions {
    pub access_key: Option<String>,
    pub acl: String,
    pub signature_endpoint: Option<String>,
    pub keyname: KeyNaming,
    pub on_get_key_name: KeyNameCallback,
}

impl S3HandlerOptions {
    pub fn new(options: &S3Options, on_get_key_name: KeyNameCallback) -> Self {
        Self {
            access_key: options.access_key.clone(),
            acl: options.acl.clone(),
            signature_endpoint: options.signature_endpoint.clone(),
            keyname: options.keyname.clone(),
            on_get_key_name,
        }
    }

    pub fn key_name(&self, id: FileId, filename: &str) -> KeyResolution {
        (self.on_get_key_name)(id, filename)
    }
}

impl fmt::Debug for S3HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3HandlerOptions")
            .field("access_key", &self.access_key)
            .field("acl", &self.acl)
            .field("signature_endpoint", &self.signature_endpoint)
            .field("keyname", &self.keyname)
            .finish_non_exhaustive()
    }
}

/// Uploader for direct-to-S3 uploads layered over a generic upload engine.
///
/// Owns the key registry of its files; every handler it creates resolves keys into that
/// registry.
pub struct S3Uploader<E: UploadEngine> {
    engine: Arc<E>,
    options: S3Options,
    resolver: Arc<KeyResolver<E>>,
    registry: KeyRegistry,
}

impl<E: UploadEngine> S3Uploader<E> {
    pub fn new(engine: Arc<E>, options: S3Options) -> Self {
        let registry = KeyRegistry::new();
        let resolver = Arc::new(KeyResolver::new(
            Arc::clone(&engine),
            options.keyname.clone(),
            registry.clone(),
        ));

        Self {
            engine,
            options,
            resolver,
            registry,
        }
    }

    pub fn from_config(engine: Arc<E>, config: UploaderConfig) -> Self {
        Self::new(engine, config.s3)
    }

    /// Key of `id`, once its resolution has succeeded.
    pub fn get_key(&self, id: FileId) -> Option<String> {
        self.registry.get(id)
    }

    /// Every resolved key, ordered by file id.
    pub fn keys(&self) -> Vec<(FileId, String)> {
        self.registry.entries()
    }

    pub fn resolve_key(&self, id: FileId, filename: &str) -> KeyResolution {
        self.resolver.resolve_key(id, filename)
    }

    /// Drops every resolved key, then resets the engine. Key lookups and resolutions
    /// wait for or fail on a reset in progress, so none of them sees one half done.
    pub fn reset(&self) {
        self.registry.clear_then(|| self.engine.reset());
    }

    /// Builds an S3 handler whose options carry a callback bound to this uploader's resolver.
    pub fn create_upload_handler(&self) -> E::Handler {
        let resolver = Arc::clone(&self.resolver);
        let on_get_key_name: KeyNameCallback =
            Arc::new(move |id: FileId, filename: &str| resolver.resolve_key(id, filename));

        let options = HandlerOptions {
            s3: S3HandlerOptions::new(&self.options, on_get_key_name),
        };
        self.engine.create_upload_handler(options, Transport::S3)
    }
}
