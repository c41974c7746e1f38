use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use doctree_core::{ProviderError, RootCapability};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::provider::SCHEME;

/// Default location of the persisted grant store.
///
/// `<data dir>/doctree-ftp/grants.json`, falling back to the working
/// directory when the platform has no data directory.
pub fn default_grants_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doctree-ftp")
        .join("grants.json")
}

/// On-disk layout of the grant store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantFile {
    /// token -> granted directory
    #[serde(default)]
    grants: BTreeMap<String, PathBuf>,
}

/// Token-to-directory grants, optionally persisted as JSON.
#[derive(Debug)]
pub struct GrantStore {
    path: Option<PathBuf>,
    grants: RwLock<BTreeMap<String, PathBuf>>,
}

impl GrantStore {
    /// Load grants from `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = path.into();
        let grants = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<GrantFile>(&bytes)?.grants,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} grants from {}", grants.len(), path.display());
        Ok(Self {
            path: Some(path),
            grants: RwLock::new(grants),
        })
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            grants: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, PathBuf>>, ProviderError> {
        self.grants
            .read()
            .map_err(|_| ProviderError::Provider("grant store poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, PathBuf>>, ProviderError> {
        self.grants
            .write()
            .map_err(|_| ProviderError::Provider("grant store poisoned".to_string()))
    }

    /// Grant access to `dir`, returning the new capability.
    pub fn insert(&self, dir: &Path) -> Result<RootCapability, ProviderError> {
        let dir = dir.canonicalize()?;
        if !dir.is_dir() {
            return Err(ProviderError::NotADirectory(dir.display().to_string()));
        }

        let capability = RootCapability::generate(SCHEME);
        let mut grants = self.write()?;
        grants.insert(capability.token.clone(), dir.clone());
        self.save(&grants)?;

        info!("Granted {} on {}", capability, dir.display());
        Ok(capability)
    }

    /// Withdraw a grant. Returns `false` if the token was unknown.
    pub fn remove(&self, capability: &RootCapability) -> Result<bool, ProviderError> {
        if capability.provider != SCHEME {
            return Ok(false);
        }
        let mut grants = self.write()?;
        let removed = grants.remove(&capability.token).is_some();
        if removed {
            self.save(&grants)?;
            info!("Revoked {}", capability);
        }
        Ok(removed)
    }

    /// Directory granted under `token`, if any.
    pub fn get(&self, token: &str) -> Result<Option<PathBuf>, ProviderError> {
        Ok(self.read()?.get(token).cloned())
    }

    /// All current grants.
    pub fn list(&self) -> Result<Vec<(RootCapability, PathBuf)>, ProviderError> {
        Ok(self
            .read()?
            .iter()
            .map(|(token, dir)| (RootCapability::new(SCHEME, token.clone()), dir.clone()))
            .collect())
    }

    /// Write the store atomically via a temp file.
    fn save(&self, grants: &BTreeMap<String, PathBuf>) -> Result<(), ProviderError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = GrantFile {
            grants: grants.clone(),
        };
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(&file)?)?;
        fs::rename(&temp_path, path)?;

        debug!("Saved {} grants to {}", grants.len(), path.display());
        Ok(())
    }
}
