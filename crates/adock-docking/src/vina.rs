//! Docking engine session backed by the AutoDock Vina executable.

use std::path::{Path, PathBuf};

use adock_common::{DockError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::{DockStage, DockingEngine, SearchBox};

const TOOL_NAME: &str = "AutoDock Vina";

/// How to invoke the Vina executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinaSettings {
    pub executable: PathBuf,
    /// Scoring function name (`vina`, `vinardo` or `ad4`)
    pub scoring: String,
    pub cpu: Option<u32>,
    pub seed: Option<i64>,
}

impl Default for VinaSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("vina"),
            scoring: "vina".to_string(),
            cpu: None,
            seed: None,
        }
    }
}

/// Vina session state kept between calls.
///
/// Intermediate poses live in a scratch directory owned by the session and
/// removed when it is dropped.
pub struct VinaCliEngine {
    settings: VinaSettings,
    scratch: TempDir,
    receptor: Option<PathBuf>,
    ligand: Option<PathBuf>,
    search_box: Option<SearchBox>,
    current_pose: Option<PathBuf>,
    docked: Option<PathBuf>,
    runs: usize,
}

impl VinaCliEngine {
    pub fn new(settings: VinaSettings) -> Result<Self> {
        Ok(Self {
            settings,
            scratch: TempDir::new()?,
            receptor: None,
            ligand: None,
            search_box: None,
            current_pose: None,
            docked: None,
            runs: 0,
        })
    }

    fn scratch_file(&mut self, label: &str) -> PathBuf {
        self.runs += 1;
        self.scratch.path().join(format!("{}_{}.pdbqt", label, self.runs))
    }

    /// Common `vina` arguments for scoring `ligand` against the loaded receptor.
    fn command(&self, stage: DockStage, ligand: &Path) -> Result<Command> {
        let receptor = self
            .receptor
            .as_ref()
            .ok_or_else(|| DockError::engine(stage, "receptor not set"))?;
        let search_box = self
            .search_box
            .as_ref()
            .ok_or_else(|| DockError::engine(stage, "search box not computed"))?;

        let mut cmd = Command::new(&self.settings.executable);
        cmd.arg("--receptor")
            .arg(receptor)
            .arg("--ligand")
            .arg(ligand)
            .arg("--scoring")
            .arg(&self.settings.scoring)
            .arg("--center_x")
            .arg(search_box.center[0].to_string())
            .arg("--center_y")
            .arg(search_box.center[1].to_string())
            .arg("--center_z")
            .arg(search_box.center[2].to_string())
            .arg("--size_x")
            .arg(search_box.size[0].to_string())
            .arg("--size_y")
            .arg(search_box.size[1].to_string())
            .arg("--size_z")
            .arg(search_box.size[2].to_string());

        if let Some(cpu) = self.settings.cpu {
            cmd.arg("--cpu").arg(cpu.to_string());
        }
        if let Some(seed) = self.settings.seed {
            cmd.arg("--seed").arg(seed.to_string());
        }
        Ok(cmd)
    }

    /// Runs `cmd` to completion and returns its stdout.
    async fn run(&self, stage: DockStage, mut cmd: Command) -> Result<String> {
        debug!(stage = %stage, "Invoking {:?}", self.settings.executable);

        let output = cmd.output().await.map_err(|e| DockError::ExternalToolFailure {
            tool: TOOL_NAME.to_string(),
            status: "not started".to_string(),
            stderr: format!("{}: {}", self.settings.executable.display(), e),
        })?;

        if !output.status.success() {
            return Err(DockError::ExternalToolFailure {
                tool: TOOL_NAME.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn current_pose(&self, stage: DockStage) -> Result<&Path> {
        self.current_pose
            .as_deref()
            .ok_or_else(|| DockError::engine(stage, "ligand not set"))
    }
}

#[async_trait]
impl DockingEngine for VinaCliEngine {
    async fn set_receptor(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(DockError::engine(
                DockStage::SetReceptor,
                format!("cannot read {}", path.display()),
            ));
        }
        self.receptor = Some(path.to_path_buf());
        self.docked = None;
        Ok(())
    }

    async fn set_ligand_from_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(DockError::engine(
                DockStage::SetLigand,
                format!("cannot read {}", path.display()),
            ));
        }
        self.ligand = Some(path.to_path_buf());
        self.current_pose = Some(path.to_path_buf());
        self.docked = None;
        Ok(())
    }

    async fn compute_maps(&mut self, search_box: &SearchBox) -> Result<()> {
        if self.receptor.is_none() {
            return Err(DockError::engine(DockStage::ComputeMaps, "receptor not set"));
        }
        // Vina recomputes its grid on every invocation; only the box is kept.
        self.search_box = Some(*search_box);
        Ok(())
    }

    async fn score(&mut self) -> Result<Vec<f64>> {
        let pose = self.current_pose(DockStage::Score)?.to_path_buf();
        let mut cmd = self.command(DockStage::Score, &pose)?;
        cmd.arg("--score_only");

        let stdout = self.run(DockStage::Score, cmd).await?;
        parse_energy(&stdout)
            .map(|e| vec![e])
            .ok_or_else(|| DockError::engine(DockStage::Score, "no energy in engine output"))
    }

    async fn optimize(&mut self) -> Result<Vec<f64>> {
        let pose = self.current_pose(DockStage::Optimize)?.to_path_buf();
        let out = self.scratch_file("minimized");
        let mut cmd = self.command(DockStage::Optimize, &pose)?;
        cmd.arg("--minimize").arg("--out").arg(&out);

        let stdout = self.run(DockStage::Optimize, cmd).await?;
        let energy = parse_energy(&stdout)
            .ok_or_else(|| DockError::engine(DockStage::Optimize, "no energy in engine output"))?;

        if !out.exists() {
            return Err(DockError::engine(DockStage::Optimize, "engine wrote no minimized pose"));
        }
        self.current_pose = Some(out);
        Ok(vec![energy])
    }

    async fn write_pose(&mut self, path: &Path, overwrite: bool) -> Result<()> {
        let pose = self.current_pose(DockStage::WritePose)?.to_path_buf();
        refuse_existing(DockStage::WritePose, path, overwrite)?;
        tokio::fs::copy(&pose, path).await?;
        Ok(())
    }

    async fn dock(&mut self, exhaustiveness: u32, n_poses: u32) -> Result<()> {
        let ligand = self
            .ligand
            .clone()
            .ok_or_else(|| DockError::engine(DockStage::Dock, "ligand not set"))?;
        let out = self.scratch_file("docked");
        let mut cmd = self.command(DockStage::Dock, &ligand)?;
        cmd.arg("--exhaustiveness")
            .arg(exhaustiveness.to_string())
            .arg("--num_modes")
            .arg(n_poses.to_string())
            .arg("--out")
            .arg(&out);

        info!(exhaustiveness, n_poses, "Running AutoDock Vina search on {:?}", ligand);
        self.run(DockStage::Dock, cmd).await?;

        if !out.exists() {
            return Err(DockError::engine(DockStage::Dock, "engine wrote no poses"));
        }
        self.docked = Some(out);
        Ok(())
    }

    async fn write_poses(&mut self, path: &Path, n_poses: u32, overwrite: bool) -> Result<()> {
        let docked = self
            .docked
            .clone()
            .ok_or_else(|| DockError::engine(DockStage::WritePoses, "no docking search has been run"))?;
        refuse_existing(DockStage::WritePoses, path, overwrite)?;

        let bytes = tokio::fs::read(&docked).await?;
        let text = String::from_utf8_lossy(&bytes);
        tokio::fs::write(path, select_poses(&text, n_poses as usize)).await?;
        Ok(())
    }
}

fn refuse_existing(stage: DockStage, path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(DockError::engine(
            stage,
            format!("{} exists and overwrite is off", path.display()),
        ));
    }
    Ok(())
}

/// Reads the total energy from Vina's console output.
///
/// Vina 1.2 prints `Estimated Free Energy of Binding   : -7.123 (kcal/mol) ...`,
/// older releases print `Affinity: -7.123 (kcal/mol)`.
pub fn parse_energy(stdout: &str) -> Option<f64> {
    stdout.lines().find_map(|line| {
        let line = line.trim();
        let rest = if line.starts_with("Estimated Free Energy of Binding") {
            line.split_once(':')?.1
        } else {
            line.strip_prefix("Affinity:")?
        };
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// Keeps the first `n` `MODEL` blocks of a multi-model PDBQT text.
pub fn select_poses(text: &str, n: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut models = 0;
    for line in text.lines() {
        if line.starts_with("MODEL") {
            models += 1;
            if models > n {
                break;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SCORE_ONLY: &str = "\
AutoDock Vina v1.2.5
Scoring function : vina
Estimated Free Energy of Binding   : -6.364 (kcal/mol) [=(1)+(2)+(3)+(4)]
(1) Final Intermolecular Energy    : -7.215 (kcal/mol)
";

    #[test]
    fn test_parse_energy_vina_1_2() {
        assert_eq!(parse_energy(SCORE_ONLY), Some(-6.364));
    }

    #[test]
    fn test_parse_energy_legacy_affinity() {
        assert_eq!(parse_energy("Affinity: -5.1 (kcal/mol)\n"), Some(-5.1));
        assert_eq!(parse_energy("Writing output ... done.\n"), None);
    }

    #[test]
    fn test_select_poses_truncates_models() {
        let text = "MODEL 1\nREMARK VINA RESULT: -7.0 0 0\nENDMDL\nMODEL 2\nREMARK VINA RESULT: -6.0 1 2\nENDMDL\nMODEL 3\nENDMDL\n";
        let two = select_poses(text, 2);
        assert_eq!(two.matches("MODEL").count(), 2);
        assert!(two.ends_with("ENDMDL\n"));
        assert_eq!(select_poses(text, 9), text);
    }

    #[test]
    fn test_select_poses_without_models() {
        let text = "REMARK Name = lig\nATOM      1  C\n";
        assert_eq!(select_poses(text, 1), text);
    }

    #[tokio::test]
    async fn test_score_before_maps_is_engine_error() {
        let dir = tempdir().unwrap();
        let receptor = dir.path().join("rec.pdbqt");
        let ligand = dir.path().join("lig.pdbqt");
        std::fs::write(&receptor, "ATOM").unwrap();
        std::fs::write(&ligand, "ATOM").unwrap();

        let mut engine = VinaCliEngine::new(VinaSettings::default()).unwrap();
        engine.set_receptor(&receptor).await.unwrap();
        engine.set_ligand_from_file(&ligand).await.unwrap();

        let err = engine.score().await.unwrap_err();
        assert!(matches!(err, DockError::Engine { ref stage, .. } if stage == "score"));
    }

    #[tokio::test]
    async fn test_write_pose_respects_overwrite() {
        let dir = tempdir().unwrap();
        let ligand = dir.path().join("lig.pdbqt");
        let target = dir.path().join("out.pdbqt");
        std::fs::write(&ligand, "REMARK input pose\n").unwrap();
        std::fs::write(&target, "old").unwrap();

        let mut engine = VinaCliEngine::new(VinaSettings::default()).unwrap();
        engine.set_ligand_from_file(&ligand).await.unwrap();

        assert!(engine.write_pose(&target, false).await.is_err());
        engine.write_pose(&target, true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "REMARK input pose\n");
    }

    #[tokio::test]
    async fn test_missing_executable_is_tool_failure() {
        let dir = tempdir().unwrap();
        let receptor = dir.path().join("rec.pdbqt");
        let ligand = dir.path().join("lig.pdbqt");
        std::fs::write(&receptor, "ATOM").unwrap();
        std::fs::write(&ligand, "ATOM").unwrap();

        let settings = VinaSettings {
            executable: dir.path().join("no-such-vina"),
            ..Default::default()
        };
        let mut engine = VinaCliEngine::new(settings).unwrap();
        engine.set_receptor(&receptor).await.unwrap();
        engine.set_ligand_from_file(&ligand).await.unwrap();
        engine.compute_maps(&SearchBox::default()).await.unwrap();

        let err = engine.score().await.unwrap_err();
        assert!(matches!(err, DockError::ExternalToolFailure { .. }));
    }
}
