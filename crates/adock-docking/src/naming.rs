//! Identifier derivation and input validation for prepared structure files.

use std::path::Path;

use adock_common::{DockError, InputRole, Result};

/// Extension every prepared ligand/receptor must carry.
pub const PDBQT_EXTENSION: &str = ".pdbqt";

/// Number of trailing characters stripped by [`trim_name`].
const TRIMMED_SUFFIX_LEN: usize = 6;

/// Short identifier for a structure file: the basename with its last six
/// characters removed.
///
/// Assumes a `.pdbqt` extension. Shorter basenames come back truncated or
/// empty; two paths with the same basename map to the same identifier.
///
/// ```
/// use adock_docking::naming::trim_name;
/// assert_eq!(trim_name("/a/b/ligand.pdbqt"), "ligand");
/// ```
pub fn trim_name(path: impl AsRef<Path>) -> String {
    let basename = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let keep = basename.chars().count().saturating_sub(TRIMMED_SUFFIX_LEN);
    basename.chars().take(keep).collect()
}

/// Checks that `path` carries the `.pdbqt` extension and exists.
///
/// The extension is checked first so that no filesystem access happens for
/// obviously wrong inputs.
pub fn validate_input(path: &Path, role: InputRole) -> Result<()> {
    if !has_pdbqt_extension(path) {
        return Err(DockError::InvalidInputFormat {
            role,
            path: path.to_path_buf(),
        });
    }
    if !path.exists() {
        return Err(DockError::InputNotFound {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

pub fn has_pdbqt_extension(path: &Path) -> bool {
    path.to_string_lossy().ends_with(PDBQT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_trim_name_strips_directory_and_extension() {
        assert_eq!(trim_name("/a/b/ligand.pdbqt"), "ligand");
        assert_eq!(trim_name("receptor_1.pdbqt"), "receptor_1");
        assert_eq!(trim_name("./data/prepared/AF-P01116.pdbqt"), "AF-P01116");
    }

    #[test]
    fn test_trim_name_short_basenames() {
        assert_eq!(trim_name("/tmp/ligand.pdb"), "liga");
        assert_eq!(trim_name("/tmp/a.pdb"), "");
        assert_eq!(trim_name("short"), "");
        assert_eq!(trim_name(""), "");
    }

    #[test]
    fn test_trim_name_same_basename_collides() {
        assert_eq!(trim_name("/x/lig.pdbqt"), trim_name("/y/lig.pdbqt"));
    }

    #[test]
    fn test_validate_rejects_wrong_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ligand.pdb");
        std::fs::write(&path, "ATOM").unwrap();

        let err = validate_input(&path, InputRole::Ligand).unwrap_err();
        assert!(matches!(
            err,
            DockError::InvalidInputFormat { role: InputRole::Ligand, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receptor.pdbqt");

        let err = validate_input(&path, InputRole::Receptor).unwrap_err();
        assert!(matches!(
            err,
            DockError::InputNotFound { role: InputRole::Receptor, .. }
        ));
    }

    #[test]
    fn test_validate_accepts_existing_pdbqt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receptor.pdbqt");
        std::fs::write(&path, "ATOM").unwrap();
        assert!(validate_input(&path, InputRole::Receptor).is_ok());
    }
}
