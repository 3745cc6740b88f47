//! Top-pose affinity extraction from Vina output files.

use std::path::Path;

use adock_common::{DockError, Result};
use tracing::debug;

/// Prefix of the result-metadata line Vina writes for every pose.
pub const VINA_RESULT_PREFIX: &str = "REMARK VINA RESULT:";

/// Whitespace-separated field holding the affinity in kcal/mol.
const AFFINITY_FIELD: usize = 3;

/// Reads `output_file` and returns the affinity of the first pose.
///
/// Invalid UTF-8 is replaced rather than rejected. A matching line that is too
/// short to carry the affinity is skipped.
pub fn extract_binding_affinity(output_file: &Path) -> Result<String> {
    let bytes = std::fs::read(output_file).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DockError::OutputFileNotFound(output_file.to_path_buf()),
        _ => DockError::Io(e),
    })?;
    let text = String::from_utf8_lossy(&bytes);

    match affinity_from_text(&text) {
        Some(affinity) => {
            debug!(file = %output_file.display(), affinity, "Extracted binding affinity");
            Ok(affinity.to_string())
        }
        None => Err(DockError::AffinityNotFound(output_file.to_path_buf())),
    }
}

/// Finds the affinity field of the first usable `REMARK VINA RESULT:` line.
pub fn affinity_from_text(text: &str) -> Option<&str> {
    text.lines()
        .filter(|line| line.starts_with(VINA_RESULT_PREFIX))
        .find_map(|line| line.split_whitespace().nth(AFFINITY_FIELD))
}
