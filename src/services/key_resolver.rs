use crate::error::{KeyError, Result};
use crate::models::{FileId, KeyNameFn, KeyNameOutcome, KeyNaming};
use crate::services::engine::UploadEngine;
use crate::services::key_registry::KeyRegistry;
use crate::utils::filename::with_extension_of;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Pending or settled outcome of a key resolution.
///
/// Settles once; every clone yields that same outcome. When it yields `Ok`, the key is
/// already in the registry.
#[derive(Clone)]
pub struct KeyResolution {
    state: ResolutionState,
}

#[derive(Clone)]
enum ResolutionState {
    Settled(Result<String>),
    Pending(Shared<BoxFuture<'static, Result<String>>>),
}

impl KeyResolution {
    pub fn settled(result: Result<String>) -> Self {
        Self {
            state: ResolutionState::Settled(result),
        }
    }

    pub fn failed(error: KeyError) -> Self {
        Self::settled(Err(error))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            state: ResolutionState::Pending(future.boxed().shared()),
        }
    }

    /// The outcome, if the resolution has already settled.
    pub fn peek(&self) -> Option<&Result<String>> {
        match &self.state {
            ResolutionState::Settled(result) => Some(result),
            ResolutionState::Pending(shared) => shared.peek(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }
}

impl Future for KeyResolution {
    type Output = Result<String>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            ResolutionState::Settled(result) => Poll::Ready(result.clone()),
            ResolutionState::Pending(shared) => Pin::new(shared).poll(cx),
        }
    }
}

impl fmt::Debug for KeyResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(result) => f.debug_tuple("KeyResolution").field(result).finish(),
            None => f.write_str("KeyResolution(<pending>)"),
        }
    }
}

/// Decides the S3 key of each file according to the configured [`KeyNaming`].
pub struct KeyResolver<E> {
    engine: Arc<E>,
    naming: KeyNaming,
    registry: KeyRegistry,
}

impl<E: UploadEngine> KeyResolver<E> {
    pub fn new(engine: Arc<E>, naming: KeyNaming, registry: KeyRegistry) -> Self {
        Self {
            engine,
            naming,
            registry,
        }
    }

    /// Resolves the key for `id`, whose original name is `filename`.
    ///
    /// `uuid` and `filename` strategies, as well as custom functions answering immediately,
    /// settle before this returns. A deferred custom name is only registered once the
    /// returned resolution is awaited; until then `get_key` does not see it.
    ///
    /// A resolution overlapping a reset fails with [`KeyError::Reset`].
    pub fn resolve_key(&self, id: FileId, filename: &str) -> KeyResolution {
        let Some(generation) = self.registry.try_generation() else {
            tracing::warn!("Not resolving key name for {} while a reset is in progress", id);
            return KeyResolution::failed(KeyError::Reset { id });
        };

        match &self.naming {
            KeyNaming::Uuid => match self.engine.uuid(id) {
                Some(uuid) => KeyResolution::settled(register(&self.registry, generation, id, uuid)),
                None => {
                    tracing::error!("No uuid available for file {}", id);
                    KeyResolution::failed(KeyError::UnknownFile { id })
                }
            },
            KeyNaming::Filename => KeyResolution::settled(register(
                &self.registry,
                generation,
                id,
                filename.to_string(),
            )),
            KeyNaming::Custom(keyname_fn) => {
                self.resolve_custom(keyname_fn, generation, id, filename)
            }
            KeyNaming::Unrecognized(value) => {
                tracing::error!("{} is not a valid value for the s3.keyname option!", value);
                KeyResolution::failed(KeyError::InvalidKeyNaming(value.clone()))
            }
        }
    }

    fn resolve_custom(
        &self,
        keyname_fn: &KeyNameFn,
        generation: u64,
        id: FileId,
        filename: &str,
    ) -> KeyResolution {
        match keyname_fn(id) {
            KeyNameOutcome::Immediate(Some(name)) => KeyResolution::settled(register(
                &self.registry,
                generation,
                id,
                custom_key(&name, filename),
            )),
            KeyNameOutcome::Immediate(None) => {
                tracing::error!("Failed to retrieve key name for {}", id);
                KeyResolution::failed(KeyError::KeyNameUnavailable { id })
            }
            KeyNameOutcome::Deferred(future) => {
                let registry = self.registry.clone();
                let filename = filename.to_string();
                KeyResolution::pending(async move {
                    match future.await {
                        Ok(name) => {
                            register(&registry, generation, id, custom_key(&name, &filename))
                        }
                        Err(e) => {
                            tracing::error!("Failed to retrieve key name for {}: {:#}", id, e);
                            Err(KeyError::KeyNameUnavailable { id })
                        }
                    }
                })
            }
        }
    }
}

/// A name from a custom function is taken as bare and gets the original extension back.
/// An empty name falls back to the original file name, which already carries one.
fn custom_key(name: &str, filename: &str) -> String {
    if name.is_empty() {
        filename.to_string()
    } else {
        with_extension_of(name, filename)
    }
}

fn register(registry: &KeyRegistry, generation: u64, id: FileId, key: String) -> Result<String> {
    if key.is_empty() {
        tracing::error!("Resolved an empty key name for {}", id);
        return Err(KeyError::EmptyKey { id });
    }

    match registry.register_for(generation, id, key) {
        Some(key) => {
            tracing::debug!(file_id = id, key = %key, "Resolved S3 key name");
            Ok(key)
        }
        None => {
            tracing::warn!("Discarding key name for {} resolved across a reset", id);
            Err(KeyError::Reset { id })
        }
    }
}
