//! Persists speech credentials into the dotenv file the service boots from.

use anyhow::Context;
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;
use uuid::Uuid;
use vox_core::{Credentials, credentials::CredentialStore};

const KEY_VAR: &str = "KEY";
const REGION_VAR: &str = "REGION";

/// Rewrites the `KEY` and `REGION` lines of a dotenv file, leaving every
/// other line as it was.
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A sibling path no other write uses, so the final rename stays atomic.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".env".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl CredentialStore for EnvFileStore {
    async fn persist(&self, credentials: &Credentials) -> anyhow::Result<()> {
        let existing = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        let updated = rewrite_env(&existing, credentials);
        let temp = self.temp_path();
        let written = match tokio::fs::write(&temp, updated).await {
            Ok(()) => tokio::fs::rename(&temp, &self.path)
                .await
                .with_context(|| format!("replacing {}", self.path.display())),
            Err(e) => Err(e).with_context(|| format!("writing {}", temp.display())),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        written?;

        debug!(path = %self.path.display(), "Credentials written to env file");
        Ok(())
    }
}

/// Returns `existing` with the credential assignments replaced or appended.
pub fn rewrite_env(existing: &str, credentials: &Credentials) -> String {
    let mut wrote_key = false;
    let mut wrote_region = false;
    let mut out = String::with_capacity(existing.len() + 64);

    for line in existing.lines() {
        let rewritten = match assigned_var(line) {
            Some(KEY_VAR) if wrote_key => continue,
            Some(KEY_VAR) => {
                wrote_key = true;
                assignment(KEY_VAR, &credentials.key)
            }
            Some(REGION_VAR) if wrote_region => continue,
            Some(REGION_VAR) => {
                wrote_region = true;
                assignment(REGION_VAR, &credentials.region)
            }
            _ => line.to_string(),
        };
        out.push_str(&rewritten);
        out.push('\n');
    }

    if !wrote_key {
        out.push_str(&assignment(KEY_VAR, &credentials.key));
        out.push('\n');
    }
    if !wrote_region {
        out.push_str(&assignment(REGION_VAR, &credentials.region));
        out.push('\n');
    }
    out
}

/// The variable a dotenv line assigns, if any.
fn assigned_var(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (name, _) = line.split_once('=')?;
    let name = name.trim();
    (!name.is_empty() && !name.starts_with('#')).then_some(name)
}

fn assignment(var: &str, value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("{var}=\"{escaped}\"")
}
