use std::fmt;

use super::error::StorageError;

const MAX_KEY_LEN: usize = 512;

/// A validated object key, e.g. `videos/1718000000000-clip.mp4`.
///
/// Keys are relative, `/`-separated, and never contain empty, hidden, or
/// traversal segments, so a key can be mapped onto a filesystem path or a
/// bucket key without further checks.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parse and validate a key.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let key = raw.trim();

        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".into()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey(format!(
                "key exceeds maximum length of {MAX_KEY_LEN} characters"
            )));
        }
        if key.chars().any(|c| c.is_control()) {
            return Err(StorageError::InvalidKey(
                "key must not contain control characters".into(),
            ));
        }
        if key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "key must not contain backslashes".into(),
            ));
        }
        if key.starts_with('/') {
            return Err(StorageError::InvalidKey("key must not start with '/'".into()));
        }

        for segment in key.split('/') {
            if segment.is_empty() {
                return Err(StorageError::InvalidKey(
                    "key must not contain empty segments".into(),
                ));
            }
            if segment == "." || segment == ".." {
                return Err(StorageError::InvalidKey(
                    "key must not contain '.' or '..' segments".into(),
                ));
            }
            if segment.starts_with('.') {
                return Err(StorageError::InvalidKey(
                    "key segments must not start with '.'".into(),
                ));
            }
        }

        Ok(Self(key.to_string()))
    }

    /// Build a key from a folder and a file name.
    pub fn join(folder: &str, name: &str) -> Result<Self, StorageError> {
        Self::parse(&format!("{folder}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
