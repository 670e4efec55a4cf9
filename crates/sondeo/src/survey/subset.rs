//! Export of filtered cases to a new system file.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::sav::{read_sav_with_options, write_sav, Compression, ReaderOptions};

use super::filters::{matching_rows, AppliedFilters, ResponseFilters};

/// Outcome of a subset export.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetSummary {
    /// Cases written.
    pub written: usize,
    /// Cases in the source file.
    pub total: usize,
    /// Filters that applied.
    pub applied: AppliedFilters,
}

/// Write the cases of `source` that pass `filters` to `output`.
///
/// Cell values are copied as stored, so declared user-missing codes survive
/// the export. Filters still treat those codes as missing. The dictionary is
/// kept. `compression` overrides the source file's compression.
///
/// # Errors
///
/// Returns [`crate::Error::DataFileNotFound`] if `source` does not exist and
/// [`crate::Error::DataFile`] if it cannot be read or the output cannot be written.
pub fn export_subset(
    source: &Path,
    output: &Path,
    filters: &ResponseFilters,
    options: ReaderOptions,
    compression: Option<Compression>,
) -> Result<SubsetSummary> {
    let raw = ReaderOptions {
        user_missing_as_missing: false,
        ..options
    };
    let dataset = read_sav_with_options(source, raw)?;
    let (rows, applied) = matching_rows(&dataset, filters);

    let mut subset = dataset.select_rows(&rows);
    if let Some(compression) = compression {
        subset.header.compression = compression;
    }
    write_sav(output, &subset)?;
    info!(
        "Exported {} of {} cases to {}",
        rows.len(),
        dataset.case_count(),
        output.display()
    );

    Ok(SubsetSummary {
        written: rows.len(),
        total: dataset.case_count(),
        applied,
    })
}
