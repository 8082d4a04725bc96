/*
File: lpad-aio/src/fs.rs
Purpose: Primitive synchronous filesystem operations.
*/
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use lpad_common::error::{LpadError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Checks if a path exists without following symlinks.
pub fn check_symlink_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// True when the path itself (not its target) is a symlink.
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        LpadError::from(e)
    })
}

/// Removes a file.
pub fn remove_file(path: &Path) -> Result<()> {
    debug!("Removing file: {}", path.display());
    fs::remove_file(path).map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed remove file {}: {}", path.display(), e);
        }
        LpadError::from(e)
    })
}

/// Removes a directory and all its contents recursively.
pub fn remove_directory_recursive(path: &Path) -> Result<()> {
    debug!("Removing directory recursively: {}", path.display());
    fs::remove_dir_all(path).map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed remove dir_all {}: {}", path.display(), e);
        }
        LpadError::from(e)
    })
}

/// Removes whatever sits at `path` (file, symlink or real directory).
/// A missing path is not an error.
pub fn remove_existing_link_target(path: &Path) -> Result<()> {
    match path.symlink_metadata() {
        Ok(metadata) => {
            debug!(
                "    Removing existing item at link target: {}",
                path.display()
            );
            let file_type = metadata.file_type();
            let remove_result = if file_type.is_dir() && !file_type.is_symlink() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            remove_result.map_err(|e| {
                debug!(
                    "    Failed to remove existing item at link target {}: {}",
                    path.display(),
                    e
                );
                LpadError::Io(Arc::new(e))
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LpadError::Io(Arc::new(e))),
    }
}

/// Creates a symbolic link. Unix only.
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    debug!("Creating symlink {} -> {}", link.display(), target.display());
    std::os::unix::fs::symlink(target, link).map_err(|e| {
        error!(
            "Failed create symlink {} -> {}: {}",
            link.display(),
            target.display(),
            e
        );
        LpadError::from(e)
    })
}

#[cfg(not(unix))]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    warn!(
        "Symlink creation not supported on this platform: {} -> {}",
        link.display(),
        target.display()
    );
    Err(LpadError::Filesystem(
        "Symlinks not supported on this platform".to_string(),
    ))
}

/// Sets file permissions (Unix only). Mode is standard Unix octal mode.
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    debug!("Setting permissions on {}: {:o}", path.display(), mode);
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        error!("Failed set permissions on {}: {}", path.display(), e);
        LpadError::from(e)
    })
}

#[cfg(not(unix))]
pub fn set_permissions(path: &Path, _mode: u32) -> Result<()> {
    debug!(
        "Permission bits not supported on this platform, leaving {} as is",
        path.display()
    );
    Ok(())
}

/// Regular file with any execute bit set. Symlinks are followed.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Atomically writes data to a file using a temporary file in the same directory.
/// `mode` is applied before the rename so the file never appears without it.
pub fn atomic_write_file(original_path: &Path, content: &[u8], mode: u32) -> Result<()> {
    let dir = original_path.parent().ok_or_else(|| {
        LpadError::Filesystem(format!(
            "Cannot get parent directory for {}",
            original_path.display()
        ))
    })?;

    create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    let temp_path = temp_file.path().to_path_buf();

    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        original_path.display(),
        temp_path.display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    set_permissions(&temp_path, mode)?;

    temp_file.persist(original_path).map_err(|e| {
        error!(
            "Failed to persist/rename temporary file {} over {}: {}",
            temp_path.display(),
            original_path.display(),
            e.error
        );
        LpadError::Io(Arc::new(e.error))
    })?;
    Ok(())
}

/// Opens (creating if needed) a file for appending or locking.
pub fn open_or_create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| {
            error!("Failed open file {}: {}", path.display(), e);
            LpadError::from(e)
        })
}

/// Lists directory entries, returning basic info.
/// Skips entries that cause errors during reading.
pub fn list_directory_entries(
    dir_path: &Path,
) -> Result<Vec<(String, PathBuf, bool /* is_dir */)>> {
    debug!("Listing directory entries for: {}", dir_path.display());
    let mut entries = Vec::new();

    let read_dir = fs::read_dir(dir_path).map_err(|e| {
        error!("Failed to read directory {}: {}", dir_path.display(), e);
        LpadError::from(e)
    })?;
    for entry_res in read_dir {
        match entry_res {
            Ok(entry) => {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                match entry.file_type() {
                    Ok(file_type) => entries.push((name, path, file_type.is_dir())),
                    Err(e) => warn!(
                        "Failed to get file type for {} in {}: {}",
                        path.display(),
                        dir_path.display(),
                        e
                    ),
                }
            }
            Err(e) => warn!("Error reading entry in {}: {}", dir_path.display(), e),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// True if `dir` holds at least one entry.
pub fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
