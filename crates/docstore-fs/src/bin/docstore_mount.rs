//! docstore-mount: serve an in-memory document store over WebDAV.
//!
//! # Usage
//!
//! ```bash
//! # Empty store
//! docstore-mount
//!
//! # Store pre-filled with the contents of a local directory
//! docstore-mount --seed ~/Documents/scans --port 8080
//!
//! # Then mount in Finder: Cmd+K → http://localhost:4918
//! ```

use bytes::Bytes;
use chrono::Utc;
use clap::Parser;
use docstore_fs::{webdav, DocFs, MountConfig};
use docstore_remote::MemoryStore;
use env_logger::Env;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// Serve a document store as a WebDAV filesystem.
#[derive(Parser, Debug)]
#[command(name = "docstore-mount")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local directory to copy into the store at startup
    #[arg(short, long, value_name = "DIR")]
    seed: Option<PathBuf>,

    /// Port to listen on (default: 4918)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Copy `dir` into the store below `remote`, depth first.
async fn seed(docs: &DocFs, dir: &Path, remote: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let mut uploaded = 0;
    let mut pending = vec![(dir.to_path_buf(), remote.to_string())];
    while let Some((local, remote)) = pending.pop() {
        for entry in fs::read_dir(&local)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let segment = docstore_fs::path::encode_name(&name);
            let target = docstore_fs::path::join_remote(&remote, &segment);
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                docs.mkdir(&target).await?;
                pending.push((entry.path(), target));
            } else if file_type.is_file() {
                let content = fs::read(entry.path())?;
                docs.put(&target, Bytes::from(content)).await?;
                uploaded += 1;
            }
        }
    }
    Ok(uploaded)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let mut config = match &args.config {
        Some(path) => match MountConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => MountConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.seed {
        config.seed_dir = Some(dir);
    }

    let store = MemoryStore::with_profile(
        config.space_max,
        config.subscription_date.unwrap_or_else(Utc::now),
    );
    let docs = DocFs::with_config(Arc::new(store), &config.fs);

    if let Some(dir) = &config.seed_dir {
        if !dir.is_dir() {
            error!("Not a directory: {}", dir.display());
            process::exit(1);
        }
        info!("Seeding from {}", dir.display());
        match seed(&docs, dir, "").await {
            Ok(count) => info!("Uploaded {} documents", count),
            Err(e) => {
                error!("Failed to seed store: {}", e);
                process::exit(1);
            }
        }
    }

    if let Err(e) = webdav::serve(docs, config.port).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
