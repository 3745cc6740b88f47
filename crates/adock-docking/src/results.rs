//! CSV output of docking results.

use std::path::Path;

use adock_common::Result;
use tracing::debug;

use crate::docking::DockingResult;

pub const CSV_HEADER: [&str; 3] = ["ligand", "receptor", "binding_affinity(kcal/mol)"];

/// Writes `results` to `path`, replacing any existing file.
///
/// An empty slice produces a header-only table.
pub fn write_results(path: &Path, results: &[DockingResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for r in results {
        writer.write_record([
            r.ligand_id.as_str(),
            r.receptor_id.as_str(),
            r.binding_affinity.as_str(),
        ])?;
    }
    writer.flush()?;

    debug!(rows = results.len(), "Wrote {}", path.display());
    Ok(())
}

pub fn write_result(path: &Path, result: &DockingResult) -> Result<()> {
    write_results(path, std::slice::from_ref(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn result(ligand: &str, affinity: &str) -> DockingResult {
        DockingResult {
            ligand_id: ligand.to_string(),
            receptor_id: "KRAS".to_string(),
            binding_affinity: affinity.to_string(),
            output_file: PathBuf::from(format!("{}_KRAS.pdbqt", ligand)),
        }
    }

    #[test]
    fn test_writes_header_and_rows_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_results(&path, &[result("b", "-6.2"), result("a", "-7.1")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "ligand,receptor,binding_affinity(kcal/mol)\nb,KRAS,-6.2\na,KRAS,-7.1\n"
        );
    }

    #[test]
    fn test_empty_results_give_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_results(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ligand,receptor,binding_affinity(kcal/mol)\n"
        );
    }

    #[test]
    fn test_rewrite_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("single.csv");
        write_results(&path, &[result("a", "-1"), result("b", "-2")]).unwrap();
        write_result(&path, &result("c", "-3.3")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("c,KRAS,-3.3\n"));
    }
}
