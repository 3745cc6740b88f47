//! Ligand and receptor preparation with the Meeko command-line tools.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use adock_common::{DockError, Result};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::batch::BindingSite;

/// Wrapper for the external PDBQT preparation executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepTool {
    pub ligand_tool: PathBuf,
    pub receptor_tool: PathBuf,
}

impl Default for PrepTool {
    fn default() -> Self {
        Self {
            ligand_tool: PathBuf::from("mk_prepare_ligand.py"),
            receptor_tool: PathBuf::from("mk_prepare_receptor.py"),
        }
    }
}

/// One receptor to prepare in [`PrepTool::prepare_receptors`].
#[derive(Debug, Clone)]
pub struct ReceptorJob {
    pub input: PathBuf,
    pub output_prefix: PathBuf,
    pub site: BindingSite,
}

impl PrepTool {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(ligand_tool: P, receptor_tool: Q) -> Self {
        Self {
            ligand_tool: ligand_tool.as_ref().to_path_buf(),
            receptor_tool: receptor_tool.as_ref().to_path_buf(),
        }
    }

    /// Converts one ligand (SDF, MOL2, ...) into a PDBQT file at `output`.
    pub async fn prepare_ligand(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        info!("Preparing ligand {:?}", input);
        ensure_parent(output).await?;

        let mut cmd = Command::new(&self.ligand_tool);
        cmd.arg("-i").arg(input).arg("-o").arg(output);
        run_tool(&self.ligand_tool, cmd).await?;

        info!("Ligand prepared: {}", output.display());
        Ok(output.to_path_buf())
    }

    /// Prepares a receptor and its docking box; returns `{prefix}.pdbqt`.
    pub async fn prepare_receptor(
        &self,
        input: &Path,
        output_prefix: &Path,
        site: &BindingSite,
    ) -> Result<PathBuf> {
        info!("Preparing receptor {:?}", input);
        ensure_parent(output_prefix).await?;

        let search_box = site.search_box();
        let mut cmd = Command::new(&self.receptor_tool);
        cmd.arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output_prefix)
            .arg("-p")
            .arg("-v")
            .arg("--box_size")
            .args(search_box.size.iter().map(|v| v.to_string()))
            .arg("--box_center")
            .args(search_box.center.iter().map(|v| v.to_string()));
        run_tool(&self.receptor_tool, cmd).await?;

        let prepared = prepared_receptor_path(output_prefix);
        info!("Receptor prepared: {}", prepared.display());
        Ok(prepared)
    }

    /// Prepares every `(input, output)` ligand, skipping failures.
    pub async fn prepare_ligands(&self, jobs: &[(PathBuf, PathBuf)]) -> Vec<PathBuf> {
        let mut prepared = Vec::with_capacity(jobs.len());
        for (input, output) in jobs {
            match self.prepare_ligand(input, output).await {
                Ok(path) => prepared.push(path),
                Err(e) => warn!("Error preparing ligand {}: {}", input.display(), e),
            }
        }
        prepared
    }

    /// Prepares every receptor, skipping failures.
    pub async fn prepare_receptors(&self, jobs: &[ReceptorJob]) -> Vec<PathBuf> {
        let mut prepared = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.prepare_receptor(&job.input, &job.output_prefix, &job.site).await {
                Ok(path) => prepared.push(path),
                Err(e) => warn!("Error preparing receptor {}: {}", job.input.display(), e),
            }
        }
        prepared
    }
}

/// `{prefix}.pdbqt`, appended rather than replacing any dot in the prefix.
pub fn prepared_receptor_path(output_prefix: &Path) -> PathBuf {
    let mut name = OsString::from(output_prefix.as_os_str());
    name.push(".pdbqt");
    PathBuf::from(name)
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn run_tool(tool: &Path, mut cmd: Command) -> Result<()> {
    let tool_name = tool.display().to_string();
    let output = cmd.output().await.map_err(|e| DockError::ExternalToolFailure {
        tool: tool_name.clone(),
        status: "not started".to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(DockError::ExternalToolFailure {
            tool: tool_name,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    debug!("{} completed successfully", tool_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prepared_receptor_path_appends_extension() {
        assert_eq!(
            prepared_receptor_path(Path::new("out/rec1")),
            PathBuf::from("out/rec1.pdbqt")
        );
        assert_eq!(
            prepared_receptor_path(Path::new("out/AF-P01116.v4")),
            PathBuf::from("out/AF-P01116.v4.pdbqt")
        );
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let dir = tempdir().unwrap();
        let tool = PrepTool::new(dir.path().join("absent_ligand"), dir.path().join("absent_receptor"));
        let err = tool
            .prepare_ligand(Path::new("lig.sdf"), &dir.path().join("prepared/lig.pdbqt"))
            .await
            .unwrap_err();
        assert!(matches!(err, DockError::ExternalToolFailure { .. }));
        // output directory is created before the tool runs
        assert!(dir.path().join("prepared").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_skipped_in_batch() {
        let dir = tempdir().unwrap();
        let tool = PrepTool::new("false", "true");

        let ligands = tool
            .prepare_ligands(&[(dir.path().join("a.sdf"), dir.path().join("a.pdbqt"))])
            .await;
        assert!(ligands.is_empty());

        let receptors = tool
            .prepare_receptors(&[ReceptorJob {
                input: dir.path().join("rec.pdb"),
                output_prefix: dir.path().join("rec"),
                site: BindingSite::Default,
            }])
            .await;
        assert_eq!(receptors, vec![dir.path().join("rec.pdbqt")]);
    }
}
