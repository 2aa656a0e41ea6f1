use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::dns::Credentials;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    zones: BTreeMap<String, Credentials>,
}

pub fn credentials_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/etc/cfddns/credentials.toml")
    }
    #[cfg(windows)]
    {
        PathBuf::from(r"C:\ProgramData\cfddns\credentials.toml")
    }
}

fn load_credentials_file(path: &Path) -> Result<CredentialsFile> {
    if !path.exists() {
        return Ok(CredentialsFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse credentials file: {}", path.display()))
}

fn save_credentials_file(path: &Path, creds: &CredentialsFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(creds).context("Failed to serialize credentials")?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    // Created owner-only on Unix, so the key is never readable by others
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open credentials file: {}", path.display()))?;

    // `mode` only applies on creation; tighten files written by older versions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions on: {}", path.display()))?;
    }

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write credentials file: {}", path.display()))?;

    Ok(())
}

pub fn store_credentials(zone: &str, credentials: &Credentials) -> Result<()> {
    store_credentials_at(&credentials_path(), zone, credentials)
}

pub fn get_credentials(zone: &str) -> Result<Credentials> {
    get_credentials_at(&credentials_path(), zone)
}

pub fn delete_credentials(zone: &str) -> Result<()> {
    delete_credentials_at(&credentials_path(), zone)
}

pub fn store_credentials_at(path: &Path, zone: &str, credentials: &Credentials) -> Result<()> {
    let mut creds_file = load_credentials_file(path)?;
    creds_file.zones.insert(zone.to_string(), credentials.clone());
    save_credentials_file(path, &creds_file)
}

pub fn get_credentials_at(path: &Path, zone: &str) -> Result<Credentials> {
    let creds_file = load_credentials_file(path)?;

    creds_file.zones.get(zone).cloned().ok_or_else(|| {
        anyhow!(
            "Credentials not found for zone: {}. \
            Add [credentials] to the config or run 'cfddns set-key {}'.",
            zone,
            zone
        )
    })
}

pub fn delete_credentials_at(path: &Path, zone: &str) -> Result<()> {
    let mut creds_file = load_credentials_file(path)?;

    if creds_file.zones.remove(zone).is_none() {
        return Err(anyhow!("No credentials found for zone: {}", zone));
    }

    save_credentials_file(path, &creds_file)
}
