use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

/// Identifier the upload engine assigns to every file it tracks.
pub type FileId = u64;

/// Future handed back by a custom key-naming function that needs time to decide.
pub type KeyNameFuture = BoxFuture<'static, anyhow::Result<String>>;

/// Integrator-supplied key-naming function.
pub type KeyNameFn = Arc<dyn Fn(FileId) -> KeyNameOutcome + Send + Sync>;

/// Result of calling a custom key-naming function.
pub enum KeyNameOutcome {
    /// The name is known right away. `None` means the function has no name for the file.
    Immediate(Option<String>),
    /// The name is still being determined.
    Deferred(KeyNameFuture),
}

impl KeyNameOutcome {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }
}

impl From<String> for KeyNameOutcome {
    fn from(name: String) -> Self {
        Self::Immediate(Some(name))
    }
}

impl From<&str> for KeyNameOutcome {
    fn from(name: &str) -> Self {
        Self::Immediate(Some(name.to_string()))
    }
}

impl From<Option<String>> for KeyNameOutcome {
    fn from(name: Option<String>) -> Self {
        Self::Immediate(name)
    }
}

impl fmt::Debug for KeyNameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(name) => f.debug_tuple("Immediate").field(name).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// How the S3 key of an uploaded file is derived (`s3.keyname`).
#[derive(Clone, Default)]
pub enum KeyNaming {
    /// The uuid the engine assigned to the file.
    #[default]
    Uuid,
    /// The original file name, unchanged.
    Filename,
    /// An integrator-supplied function. A bare name it returns gets the file's extension back.
    Custom(KeyNameFn),
    /// Any other configured value. Every resolution against it fails.
    Unrecognized(String),
}

impl KeyNaming {
    pub fn custom<F, O>(f: F) -> Self
    where
        F: Fn(FileId) -> O + Send + Sync + 'static,
        O: Into<KeyNameOutcome>,
    {
        Self::Custom(Arc::new(move |id: FileId| -> KeyNameOutcome { f(id).into() }))
    }
}

impl From<&str> for KeyNaming {
    fn from(tag: &str) -> Self {
        match tag {
            "uuid" => Self::Uuid,
            "filename" => Self::Filename,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Debug for KeyNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid => f.write_str("Uuid"),
            Self::Filename => f.write_str("Filename"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Unrecognized(value) => f.debug_tuple("Unrecognized").field(value).finish(),
        }
    }
}

impl fmt::Display for KeyNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid => f.write_str("uuid"),
            Self::Filename => f.write_str("filename"),
            Self::Custom(_) => f.write_str("custom function"),
            Self::Unrecognized(value) => f.write_str(value),
        }
    }
}

// Accepts any JSON value so a bad setting surfaces at resolution time, not at load time.
impl<'de> Deserialize<'de> for KeyNaming {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(tag) => KeyNaming::from(tag.as_str()),
            other => KeyNaming::Unrecognized(other.to_string()),
        })
    }
}

/// Transport variant the engine builds a handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Traditional,
    S3,
}
