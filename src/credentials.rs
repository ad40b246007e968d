//! Persistent storage for provider keys and the active provider selection.
//!
//! The store is a flat namespace of string keys to string values. Provider keys live
//! under `<provider>_api_key` and the active selection under [`ACTIVE_PROVIDER_KEY`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::providers::{CredentialCheck, ProviderIdentifier};
use crate::utils::private_file::write_private;

pub(crate) const ACTIVE_PROVIDER_KEY: &str = "active_api_provider";

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to read credentials from \"{}\"", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to write credentials to \"{}\"", .0.display())]
    Write(PathBuf, #[source] std::io::Error),
    #[error("credential file \"{}\" is malformed", .0.display())]
    Malformed(PathBuf, #[source] toml::de::Error),
    #[error("failed to serialize credentials")]
    Serialize(#[from] toml::ser::Error),
    #[error("refusing to store an empty key")]
    EmptySecret,
}

pub(crate) trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error>;

    /// Returns whether a value was present.
    fn remove(&mut self, key: &str) -> Result<bool, Error>;
}

pub(crate) fn credential_key(provider: ProviderIdentifier) -> String {
    format!("{}_api_key", provider)
}

/// Stores the key for `provider`. The key is saved even when it does not look like
/// one of the provider's keys; the returned check lets the caller warn about it.
pub(crate) fn save_credential<S: CredentialStore + ?Sized>(
    store: &mut S,
    provider: ProviderIdentifier,
    secret: &str,
) -> Result<CredentialCheck, Error> {
    let secret = secret.trim();

    if secret.is_empty() {
        return Err(Error::EmptySecret);
    }

    store.set(&credential_key(provider), secret)?;

    Ok(provider.config().check_credential(secret))
}

pub(crate) fn load_credential<S: CredentialStore + ?Sized>(
    store: &S,
    provider: ProviderIdentifier,
) -> Result<Option<String>, Error> {
    store.get(&credential_key(provider))
}

pub(crate) fn select_provider<S: CredentialStore + ?Sized>(
    store: &mut S,
    provider: ProviderIdentifier,
) -> Result<(), Error> {
    store.set(ACTIVE_PROVIDER_KEY, &provider.to_string())
}

/// The raw stored selection, which is not guaranteed to name a known provider.
pub(crate) fn stored_selection<S: CredentialStore + ?Sized>(
    store: &S,
) -> Result<Option<String>, Error> {
    store.get(ACTIVE_PROVIDER_KEY)
}

/// A store kept as a TOML table on disk. Every mutation rewrites the whole file.
pub(crate) struct FileCredentialStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCredentialStore {
    pub(crate) fn open(path: &Path) -> Result<FileCredentialStore, Error> {
        let entries: BTreeMap<String, String> = match std::fs::read_to_string(path) {
            Ok(raw) => {
                toml::from_str(&raw).map_err(|e| Error::Malformed(path.to_path_buf(), e))?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(Error::Read(path.to_path_buf(), err)),
        };

        Ok(FileCredentialStore {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), Error> {
        let serialized = toml::to_string(&self.entries)?;

        write_private(&self.path, serialized.as_bytes())
            .map_err(|e| Error::Write(self.path.clone(), e))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());

        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<bool, Error> {
        let removed = self.entries.remove(key).is_some();

        if removed {
            self.flush()?;
        }

        Ok(removed)
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryCredentialStore {
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonconforming_key_is_still_saved() {
        let mut store = MemoryCredentialStore::default();

        let check = save_credential(&mut store, ProviderIdentifier::DeepSeek, "not-a-key").unwrap();

        assert_eq!(
            check,
            CredentialCheck::NonConforming {
                expected_prefix: "sk-"
            }
        );
        assert_eq!(
            load_credential(&store, ProviderIdentifier::DeepSeek)
                .unwrap()
                .as_deref(),
            Some("not-a-key")
        );
    }

    #[test]
    fn test_one_credential_per_provider() {
        let mut store = MemoryCredentialStore::default();

        save_credential(&mut store, ProviderIdentifier::OpenAI, "sk-first").unwrap();
        save_credential(&mut store, ProviderIdentifier::OpenAI, "  sk-second\n").unwrap();
        save_credential(&mut store, ProviderIdentifier::DeepSeek, "sk-other").unwrap();

        assert_eq!(
            load_credential(&store, ProviderIdentifier::OpenAI)
                .unwrap()
                .as_deref(),
            Some("sk-second")
        );
        assert_eq!(
            load_credential(&store, ProviderIdentifier::DeepSeek)
                .unwrap()
                .as_deref(),
            Some("sk-other")
        );
        assert_eq!(load_credential(&store, ProviderIdentifier::OpenRouter).unwrap(), None);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let mut store = MemoryCredentialStore::default();

        let result = save_credential(&mut store, ProviderIdentifier::DeepSeek, "   ");

        assert!(matches!(result, Err(Error::EmptySecret)));
        assert_eq!(load_credential(&store, ProviderIdentifier::DeepSeek).unwrap(), None);
    }

    #[test]
    fn test_select_provider() {
        let mut store = MemoryCredentialStore::default();

        assert_eq!(stored_selection(&store).unwrap(), None);

        select_provider(&mut store, ProviderIdentifier::OpenRouter).unwrap();

        assert_eq!(
            stored_selection(&store).unwrap().as_deref(),
            Some("openrouter")
        );
    }

    #[test]
    fn test_file_store_round_trips_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nlsql").join("credentials.toml");

        {
            let mut store = FileCredentialStore::open(&path).unwrap();
            save_credential(&mut store, ProviderIdentifier::DeepSeek, "sk-abc123").unwrap();
            select_provider(&mut store, ProviderIdentifier::DeepSeek).unwrap();
        }

        let mut store = FileCredentialStore::open(&path).unwrap();

        assert_eq!(
            load_credential(&store, ProviderIdentifier::DeepSeek)
                .unwrap()
                .as_deref(),
            Some("sk-abc123")
        );
        assert_eq!(stored_selection(&store).unwrap().as_deref(), Some("deepseek"));

        assert!(store.remove(&credential_key(ProviderIdentifier::DeepSeek)).unwrap());
        assert!(!store.remove(&credential_key(ProviderIdentifier::DeepSeek)).unwrap());

        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(load_credential(&store, ProviderIdentifier::DeepSeek).unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");

        std::fs::write(&path, "this is = = not toml").unwrap();

        assert!(matches!(
            FileCredentialStore::open(&path),
            Err(Error::Malformed(_, _))
        ));
    }
}
