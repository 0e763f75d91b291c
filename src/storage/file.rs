use std::fs;
use std::path::{Path, PathBuf};

use super::KeyValueStore;

/// File-backed store: one file per key under the configured data directory.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub(crate) fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(err) = fs::create_dir_all(&dir) {
            tracing::warn!(error = %err, path = %dir.display(), "Failed to create data directory");
        }
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys come from the fixed `keys` module; sanitize anyway so a stray
        // separator cannot escape the data directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(safe)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Failed to read stored value");
                None
            }
        }
    }

    fn put(&self, key: &str, value: &str) {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(err) = fs::create_dir_all(parent) {
                    tracing::warn!(
                        error = %err,
                        path = %parent.display(),
                        "Failed to create data directory"
                    );
                }
            }
        }
        if let Err(err) = write_private(&path, value) {
            tracing::warn!(error = %err, path = %path.display(), "Failed to write stored value");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Failed to remove stored value");
            }
        }
    }
}

fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    fs::write(path, value)?;

    // The token lives here; keep it out of reach of other local users.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
