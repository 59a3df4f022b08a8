//! ZIP output for assembled packages.

use crate::package::{Package, PackageEntry};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;
use vaultport_core::{Error, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write every entry of `package` into a deflate-compressed ZIP at `output`.
///
/// Missing parent directories are created. Any failure to create or write
/// the archive is fatal; a partially written file is removed.
#[instrument(skip_all, fields(output = %output.display()))]
pub fn write_package(package: &dyn Package, output: &Path) -> Result<PathBuf> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::package(format!("Cannot create {}: {}", parent.display(), e))
        })?;
    }

    let result = write_entries(package, output);
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    let written = result?;

    log::info!("Wrote {} entries to {}", written, output.display());
    Ok(output.to_path_buf())
}

fn write_entries(package: &dyn Package, output: &Path) -> Result<usize> {
    let file = File::create(output)
        .map_err(|e| Error::package(format!("Cannot create {}: {}", output.display(), e)))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries = package.entries();
    for entry in &entries {
        zip.start_file(entry.path(), options)
            .map_err(|e| Error::package(format!("Cannot add {}: {}", entry.path(), e)))?;
        match entry {
            PackageEntry::Bytes { data, .. } => zip.write_all(data),
            PackageEntry::File { source, .. } => {
                File::open(source).and_then(|mut f| io::copy(&mut f, &mut zip).map(|_| ()))
            }
        }
        .map_err(|e| Error::package(format!("Cannot write {}: {}", entry.path(), e)))?;
    }

    zip.finish()
        .map_err(|e| Error::package(format!("Cannot finish {}: {}", output.display(), e)))?;
    Ok(entries.len())
}
