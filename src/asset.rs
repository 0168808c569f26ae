use crate::error::{ProjectError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Content address of a payload: md5 of its bytes plus the file extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub asset_id: String,
    pub data_format: String,
}

impl AssetRef {
    pub fn md5ext(&self) -> String {
        format!("{}.{}", self.asset_id, self.data_format)
    }
}

pub fn digest(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// A source file read and hashed but not yet staged.
#[derive(Debug, Clone)]
pub struct SourcedAsset {
    pub asset: AssetRef,
    pub data: Vec<u8>,
    source: PathBuf,
}

/// Payloads added since the last save, keyed by their archive file name.
#[derive(Debug, Default)]
pub struct AssetStore {
    by_source: HashMap<PathBuf, AssetRef>,
    pending: BTreeMap<String, Vec<u8>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and hashes `path` without staging it.
    ///
    /// A path staged earlier in this session is answered from the staged
    /// bytes, so the returned data always matches the returned hash.
    pub fn load(&self, path: &Path) -> Result<SourcedAsset> {
        if let Some(hit) = self.by_source.get(path) {
            if let Some(data) = self.pending.get(&hit.md5ext()) {
                return Ok(SourcedAsset {
                    asset: hit.clone(),
                    data: data.clone(),
                    source: path.to_path_buf(),
                });
            }
        }
        if !path.is_file() {
            return Err(ProjectError::not_found("Asset file", path.display().to_string()));
        }
        let data_format = extension_of(path)?;
        let data = fs::read(path)?;
        let asset = AssetRef {
            asset_id: digest(&data),
            data_format,
        };
        Ok(SourcedAsset {
            asset,
            data,
            source: path.to_path_buf(),
        })
    }

    /// Queues a loaded payload for the next save.
    ///
    /// Two paths with identical bytes resolve to the same `md5ext` and share a
    /// single staged payload.
    pub fn stage(&mut self, sourced: SourcedAsset) -> AssetRef {
        let SourcedAsset {
            asset,
            data,
            source,
        } = sourced;
        tracing::debug!(source = %source.display(), md5ext = %asset.md5ext(), "staged asset");
        self.pending.entry(asset.md5ext()).or_insert(data);
        self.by_source.insert(source, asset.clone());
        asset
    }

    pub fn add(&mut self, path: &Path) -> Result<AssetRef> {
        let sourced = self.load(path)?;
        Ok(self.stage(sourced))
    }

    /// Stages an in-memory payload, such as a generated default costume.
    pub fn add_bytes(&mut self, data: &[u8], data_format: &str) -> AssetRef {
        let asset = AssetRef {
            asset_id: digest(data),
            data_format: data_format.to_lowercase(),
        };
        self.pending
            .entry(asset.md5ext())
            .or_insert_with(|| data.to_vec());
        asset
    }

    pub fn is_pending(&self, md5ext: &str) -> bool {
        self.pending.contains_key(md5ext)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Writes every staged payload into `dir` under its `md5ext` name and
    /// clears the staging state. Returns the number of files written.
    pub fn materialize(&mut self, dir: &Path) -> Result<usize> {
        let mut written = 0;
        for (md5ext, data) in &self.pending {
            let dest = dir.join(md5ext);
            if dest.exists() {
                continue;
            }
            fs::write(&dest, data)?;
            written += 1;
        }
        self.pending.clear();
        self.by_source.clear();
        Ok(written)
    }
}

pub(crate) fn extension_of(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|x| x.to_str())
        .filter(|x| !x.is_empty())
        .map(str::to_lowercase)
        .ok_or_else(|| {
            ProjectError::validation(
                "asset file",
                format!("'{}' has no file extension", path.display()),
            )
        })
}
