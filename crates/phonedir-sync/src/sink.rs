use crate::{Result, SyncError};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Writes the document to `target`, or to stdout when there is none.
///
/// Files are replaced atomically: the document goes to a temporary sibling
/// first and is renamed over the target, so readers see either the previous
/// directory or the complete new one.
pub fn write_document(target: Option<&Path>, document: &str) -> Result<()> {
    match target {
        Some(path) => write_file(path, document),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn write_file(path: &Path, document: &str) -> Result<()> {
    let write_err = |source| SyncError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let temp = temp_path(path)?;
    let result = File::create(&temp)
        .and_then(|mut file| {
            file.write_all(document.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));
    if let Err(err) = result {
        let _ = fs::remove_file(&temp);
        return Err(write_err(err));
    }
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| SyncError::Write {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"),
    })?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(name);
    temp_name.push(format!(".tmp{}", process::id()));
    Ok(path.with_file_name(temp_name))
}
