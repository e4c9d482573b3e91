use clap::Parser;
use dotenvy::dotenv;
use s3_keyname::{
    BasicEngine, KeyNameOutcome, KeyNaming, S3Options, S3Uploader, UploadEngine, UploaderConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve the S3 object keys files would be uploaded under
#[derive(Parser, Debug)]
#[command(name = "s3-keyname", version)]
struct Cli {
    /// Naming strategy: "uuid" or "filename"
    #[arg(long)]
    keyname: Option<String>,

    /// Store every file as <PREFIX>/<uuid>, keeping its extension
    #[arg(long, conflicts_with = "keyname")]
    prefix: Option<String>,

    /// JSON file with uploader options, e.g. {"s3": {"keyname": "filename"}}
    #[arg(long)]
    config: Option<PathBuf>,

    /// Names of the files to resolve keys for
    #[arg(required = true)]
    files: Vec<String>,
}

/// Reads uploader options from `path`, or from the environment when no file is given.
fn load_config(path: Option<&Path>) -> anyhow::Result<UploaderConfig> {
    match path {
        Some(path) => UploaderConfig::from_json(&std::fs::read_to_string(path)?),
        None => Ok(UploaderConfig::from_env()),
    }
}

/// Applies `--keyname` / `--prefix` on top of the loaded options.
fn s3_options(cli: &Cli, config: UploaderConfig, engine: &Arc<BasicEngine>) -> S3Options {
    let mut options = config.s3;
    if let Some(tag) = &cli.keyname {
        options.keyname = KeyNaming::from(tag.as_str());
    }
    if let Some(prefix) = cli.prefix.clone() {
        let engine = Arc::clone(engine);
        options.keyname = KeyNaming::custom(move |id| {
            KeyNameOutcome::Immediate(engine.uuid(id).map(|uuid| format!("{}/{}", prefix, uuid)))
        });
    }
    options
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_keyname=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let engine = Arc::new(BasicEngine::new());
    let config = load_config(cli.config.as_deref())?;
    let options = s3_options(&cli, config, &engine);

    info!("🔑 Resolving {} key(s) with strategy: {}", cli.files.len(), options.keyname);

    let uploader = S3Uploader::new(Arc::clone(&engine), options);
    let ids: Vec<_> = cli.files.iter().map(|name| engine.add_file(name.as_str())).collect();
    let handler = uploader.create_upload_handler();

    let results = futures::future::join_all(ids.iter().map(|&id| handler.key_name(id))).await;

    let mut failed = 0;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(key) => println!("{}\t{}", id, key),
            Err(e) => {
                error!("❌ {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} key(s) could not be resolved", failed, ids.len());
    }

    info!("✅ Resolved {} key(s)", uploader.keys().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> UploaderConfig {
        UploaderConfig::from_json(json).unwrap()
    }

    #[test]
    fn test_keyname_flag_overrides_config() {
        let cli = Cli::try_parse_from(["s3-keyname", "--keyname", "filename", "a.txt"]).unwrap();
        let engine = Arc::new(BasicEngine::new());
        let config = config(r#"{"s3": {"keyname": "uuid", "acl": "public-read"}}"#);
        let options = s3_options(&cli, config, &engine);
        assert!(matches!(options.keyname, KeyNaming::Filename));
        assert_eq!(options.acl, "public-read");
    }

    #[test]
    fn test_config_keyname_used_without_flags() {
        let cli = Cli::try_parse_from(["s3-keyname", "a.txt"]).unwrap();
        let engine = Arc::new(BasicEngine::new());
        let options = s3_options(&cli, config(r#"{"s3": {"keyname": "filename"}}"#), &engine);
        assert!(matches!(options.keyname, KeyNaming::Filename));
    }

    #[test]
    fn test_prefix_builds_custom_strategy() {
        let cli = Cli::try_parse_from(["s3-keyname", "--prefix", "media", "clip.mp4"]).unwrap();
        let engine = Arc::new(BasicEngine::new());
        let options = s3_options(&cli, config("{}"), &engine);
        assert!(matches!(options.keyname, KeyNaming::Custom(_)));

        let uploader = S3Uploader::new(Arc::clone(&engine), options);
        let id = engine.add_file("clip.mp4");
        let uuid = engine.uuid(id).unwrap();
        assert_eq!(
            uploader.resolve_key(id, "clip.mp4").peek(),
            Some(&Ok(format!("media/{}.mp4", uuid)))
        );
    }

    #[test]
    fn test_prefix_conflicts_with_keyname() {
        let parsed = Cli::try_parse_from(["s3-keyname", "--prefix", "p", "--keyname", "uuid", "a"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("s3-keyname-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"s3": {"keyname": "filename", "acl": "public-read"}}"#).unwrap();

        let loaded = load_config(Some(path.as_path()));
        std::fs::remove_file(&path).unwrap();
        let loaded = loaded.unwrap();
        assert!(matches!(loaded.s3.keyname, KeyNaming::Filename));
        assert_eq!(loaded.s3.acl, "public-read");

        assert!(load_config(Some(Path::new("/nonexistent/s3-keyname.json"))).is_err());
    }
}
