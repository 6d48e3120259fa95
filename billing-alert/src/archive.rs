use std::fs::File;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::errors::BillingError;
use crate::records::RawBillingRow;

/// Expected path of the uncompressed export: the archive path minus its
/// trailing 4-character `.zip` suffix
pub fn extracted_csv_path(archive_path: &Path) -> Result<PathBuf, BillingError> {
    let path = archive_path.to_string_lossy();
    match path.strip_suffix(".zip") {
        Some(stem) => Ok(PathBuf::from(stem)),
        None => Err(BillingError::Archive(format!(
            "expected a .zip archive, got [{}]",
            path
        ))),
    }
}

/// Unpack the archive next to itself unless the CSV is already present,
/// returning the CSV path. Presence alone counts as fresh, same caveat
/// as the download cache.
pub fn extract_archive(archive_path: &Path) -> Result<PathBuf, BillingError> {
    let csv_path = extracted_csv_path(archive_path)?;

    if csv_path.exists() {
        log::debug!("Export already extracted at [{}]", csv_path.display());
        return Ok(csv_path);
    }

    let target = archive_path.parent().unwrap_or_else(|| Path::new("."));
    log::debug!(
        "Extracting [{}] into [{}]",
        archive_path.display(),
        target.display()
    );

    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    archive.extract(target)?;

    if !csv_path.exists() {
        return Err(BillingError::Archive(format!(
            "archive did not contain [{}]",
            csv_path.display()
        )));
    }

    Ok(csv_path)
}

/// Open the export and stream it as header-addressed rows
pub fn read_records(
    csv_path: &Path,
) -> Result<impl Iterator<Item = Result<RawBillingRow, BillingError>>, BillingError> {
    let reader = csv::Reader::from_path(csv_path)?;
    Ok(reader
        .into_deserialize::<RawBillingRow>()
        .map(|row| row.map_err(BillingError::from)))
}
