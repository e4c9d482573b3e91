use crate::models::KeyNaming;
use serde::Deserialize;
use std::env;

/// S3 options handed to every upload handler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct S3Options {
    /// Public AWS access key, required by the S3 transport
    pub access_key: Option<String>,

    /// Canned ACL applied to stored objects (default: "private")
    pub acl: String,

    /// Endpoint that signs upload policies, required by the S3 transport
    pub signature_endpoint: Option<String>,

    /// Key naming strategy: "uuid", "filename" or a function (default: "uuid")
    pub keyname: KeyNaming,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            access_key: None,
            acl: "private".to_string(),
            signature_endpoint: None,
            keyname: KeyNaming::Uuid,
        }
    }
}

impl S3Options {
    /// Load S3 options from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            access_key: env::var("S3_ACCESS_KEY").ok().or(default.access_key),
            acl: env::var("S3_ACL").unwrap_or(default.acl),
            signature_endpoint: env::var("S3_SIGNATURE_ENDPOINT")
                .ok()
                .or(default.signature_endpoint),
            keyname: env::var("S3_KEYNAME")
                .map(|v| KeyNaming::from(v.as_str()))
                .unwrap_or(default.keyname),
        }
    }

    pub fn with_key_naming(mut self, keyname: KeyNaming) -> Self {
        self.keyname = keyname;
        self
    }
}

/// Uploader configuration, shaped like the integrator-facing options object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub s3: S3Options,
}

impl UploaderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            s3: S3Options::from_env(),
        }
    }

    /// Parse configuration from a JSON document such as `{"s3": {"keyname": "filename"}}`
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
