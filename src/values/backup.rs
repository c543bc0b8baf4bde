//! Timestamped backups of the values file

use crate::error::MirrorError;
use chrono::{Local, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// `<path>.backup.<YYYYMMDD_HHMMSS>`
pub fn backup_path_for(path: &Path, at: NaiveDateTime) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".backup.{}", at.format("%Y%m%d_%H%M%S")));
    PathBuf::from(name)
}

/// Copy `path` next to itself under a timestamped name.
pub fn backup_file(path: &Path) -> Result<PathBuf, MirrorError> {
    copy_to_fresh(path, backup_path_for(path, Local::now().naive_local()))
}

/// Copy `path` to `stamped`, or to `stamped.N` for the first free `N` when an
/// earlier backup already holds that name.
fn copy_to_fresh(path: &Path, stamped: PathBuf) -> Result<PathBuf, MirrorError> {
    let mut source = File::open(path)?;

    let mut dest = stamped.clone();
    let mut suffix = 0u32;
    let mut file = loop {
        match OpenOptions::new().write(true).create_new(true).open(&dest) {
            Ok(file) => break file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                suffix += 1;
                let mut name = stamped.as_os_str().to_owned();
                name.push(format!(".{suffix}"));
                dest = PathBuf::from(name);
            }
            Err(err) => return Err(err.into()),
        }
    };

    io::copy(&mut source, &mut file)?;
    tracing::info!("Backed up {} to {}", path.display(), dest.display());
    Ok(dest)
}
