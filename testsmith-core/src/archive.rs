//! Zip archiving of the generated test tree.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

fn archive_error(archive_path: &Path, message: impl std::fmt::Display) -> Error {
    Error::Archive {
        path: archive_path.display().to_string(),
        message: message.to_string(),
    }
}

/// Compresses the whole tree under `src_dir` into a zip file at
/// `archive_path`. Entry names are relative to `src_dir` and always use
/// forward slashes.
pub fn zip_directory(src_dir: &Path, archive_path: &Path) -> Result<()> {
    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(|e| archive_error(archive_path, e))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let entry_name = relative
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");

        if entry.file_type().is_dir() {
            writer
                .add_directory(entry_name.as_str(), options)
                .map_err(|e| archive_error(archive_path, e))?;
        } else {
            writer
                .start_file(entry_name.as_str(), options)
                .map_err(|e| archive_error(archive_path, e))?;
            let contents = fs::read(entry.path())?;
            writer.write_all(&contents)?;
        }
        debug!(entry = %entry_name, "Added archive entry");
    }

    writer.finish().map_err(|e| archive_error(archive_path, e))?;
    info!(archive = %archive_path.display(), "Created archive");
    Ok(())
}
