//! Single-pair docking through an owned engine session.

use std::path::{Path, PathBuf};

use adock_common::{DockError, InputRole, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::affinity::extract_binding_affinity;
use crate::engine::{DockStage, DockingEngine, SearchBox};
use crate::naming::{trim_name, validate_input};

/// Everything needed to dock one ligand against one receptor.
#[derive(Debug, Clone)]
pub struct DockingTask {
    pub ligand_path: PathBuf,
    pub receptor_path: PathBuf,
    pub search_box: SearchBox,
    pub exhaustiveness: u32,
    pub pose_count: u32,
    pub output_dir: PathBuf,
}

impl DockingTask {
    pub fn ligand_id(&self) -> String {
        trim_name(&self.ligand_path)
    }

    pub fn receptor_id(&self) -> String {
        trim_name(&self.receptor_path)
    }

    /// `{output_dir}/{ligand_id}_{receptor_id}.pdbqt`, the same path on every run.
    pub fn output_file(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.pdbqt", self.ligand_id(), self.receptor_id()))
    }
}

/// Outcome of one docked pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockingResult {
    pub ligand_id: String,
    pub receptor_id: String,
    /// Top-pose affinity in kcal/mol, as written by the engine
    pub binding_affinity: String,
    pub output_file: PathBuf,
}

impl DockingResult {
    /// Affinity as a number, if the engine wrote a parseable one.
    pub fn affinity_kcal_mol(&self) -> Option<f64> {
        self.binding_affinity.parse().ok()
    }
}

/// Drives a [`DockingEngine`] session through the fixed per-pair sequence.
///
/// The session is reused across calls; each run replaces the receptor and
/// ligand loaded by the previous one.
pub struct Docker<E> {
    engine: E,
}

impl<E: DockingEngine> Docker<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Docks one pair and returns its top-pose affinity.
    ///
    /// Inputs are validated before the engine is touched. A failure at any
    /// stage, input checks included, is logged with the stage and both files,
    /// then returned.
    pub async fn dock(&mut self, task: &DockingTask) -> Result<DockingResult> {
        let output_file = task.output_file();
        let outcome = match check_inputs(task).await {
            Ok(()) => self.run_stages(task, &output_file).await,
            Err(e) => Err((DockStage::CheckInputs, e)),
        };

        match outcome {
            Ok(binding_affinity) => {
                info!(
                    ligand = %task.ligand_path.display(),
                    receptor = %task.receptor_path.display(),
                    affinity = %binding_affinity,
                    "Docking successful: output saved in {}",
                    task.output_dir.display()
                );
                Ok(DockingResult {
                    ligand_id: task.ligand_id(),
                    receptor_id: task.receptor_id(),
                    binding_affinity,
                    output_file,
                })
            }
            Err((stage, e)) => {
                error!(
                    stage = %stage,
                    ligand = %task.ligand_path.display(),
                    receptor = %task.receptor_path.display(),
                    "Docking failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &mut self,
        task: &DockingTask,
        output_file: &Path,
    ) -> std::result::Result<String, (DockStage, DockError)> {
        let at = |stage: DockStage| move |e: DockError| (stage, e);

        self.engine
            .set_receptor(&task.receptor_path)
            .await
            .map_err(at(DockStage::SetReceptor))?;
        info!("Receptor: {}", task.receptor_path.display());

        self.engine
            .set_ligand_from_file(&task.ligand_path)
            .await
            .map_err(at(DockStage::SetLigand))?;
        info!("Ligand: {}", task.ligand_path.display());

        self.engine
            .compute_maps(&task.search_box)
            .await
            .map_err(at(DockStage::ComputeMaps))?;

        let energy = self.engine.score().await.map_err(at(DockStage::Score))?;
        info!("Score before minimization: {:.3} (kcal/mol)", first_energy(&energy));

        let minimized = self.engine.optimize().await.map_err(at(DockStage::Optimize))?;
        info!("Score after minimization : {:.3} (kcal/mol)", first_energy(&minimized));

        self.engine
            .write_pose(output_file, true)
            .await
            .map_err(at(DockStage::WritePose))?;

        self.engine
            .dock(task.exhaustiveness, task.pose_count)
            .await
            .map_err(at(DockStage::Dock))?;
        self.engine
            .write_poses(output_file, task.pose_count, true)
            .await
            .map_err(at(DockStage::WritePoses))?;

        extract_binding_affinity(output_file).map_err(at(DockStage::ExtractAffinity))
    }
}

/// Both inputs must be valid before the output directory is created.
async fn check_inputs(task: &DockingTask) -> Result<()> {
    validate_input(&task.ligand_path, InputRole::Ligand)?;
    validate_input(&task.receptor_path, InputRole::Receptor)?;
    tokio::fs::create_dir_all(&task.output_dir).await?;
    Ok(())
}

fn first_energy(energies: &[f64]) -> f64 {
    energies.first().copied().unwrap_or(f64::NAN)
}
