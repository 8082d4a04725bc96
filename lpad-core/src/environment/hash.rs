// lpad-core/src/environment/hash.rs
//! Project identity: `<sanitized basename>_<32 hex chars of sha256(path)>`.
use std::path::{Path, PathBuf};

use lpad_common::error::{LpadError, Result};
use sha2::{Digest, Sha256};

const MAX_NAME_LEN: usize = 32;
const DIGEST_HEX_LEN: usize = 32;

/// Hash of an already canonical path. Pure; never touches the filesystem.
pub fn project_hash(canonical: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path_bytes(canonical));
    let digest = hex::encode(hasher.finalize());
    format!("{}_{}", readable_name(canonical), &digest[..DIGEST_HEX_LEN])
}

/// Canonicalizes `dir` (resolving symlinks) and hashes the result.
pub fn hash_dir(dir: &Path) -> Result<(PathBuf, String)> {
    let canonical = dir.canonicalize().map_err(|e| {
        LpadError::NotFound(format!("project directory {}: {}", dir.display(), e))
    })?;
    let hash = project_hash(&canonical);
    Ok((canonical, hash))
}

fn readable_name(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "root".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().as_bytes().to_vec()
}
