//! Docking engine session contract.
//!
//! An engine session is stateful: the receptor, ligand and search box set by
//! earlier calls are used by later ones, and setting a new receptor or ligand
//! replaces the previous one. A session is driven by one caller at a time.

use std::fmt;
use std::path::Path;

use adock_common::{DockError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default search-box center for receptors from a structure-prediction pipeline.
pub const DEFAULT_CENTER: [f64; 3] = [-0.319, 5.27, 1.59];

/// Default search-box edge lengths in Angstrom.
pub const DEFAULT_BOX_SIZE: [f64; 3] = [80.0, 80.0, 80.0];

/// Steps of a single docking run, in the order they are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockStage {
    CheckInputs,
    SetReceptor,
    SetLigand,
    ComputeMaps,
    Score,
    Optimize,
    WritePose,
    Dock,
    WritePoses,
    ExtractAffinity,
}

impl fmt::Display for DockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DockStage::CheckInputs => "check inputs",
            DockStage::SetReceptor => "set receptor",
            DockStage::SetLigand => "set ligand",
            DockStage::ComputeMaps => "compute maps",
            DockStage::Score => "score",
            DockStage::Optimize => "optimize",
            DockStage::WritePose => "write pose",
            DockStage::Dock => "dock",
            DockStage::WritePoses => "write poses",
            DockStage::ExtractAffinity => "extract affinity",
        };
        f.write_str(name)
    }
}

/// The region the engine searches for poses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchBox {
    pub center: [f64; 3],
    pub size: [f64; 3],
}

impl SearchBox {
    pub fn new(center: [f64; 3], size: [f64; 3]) -> Result<Self> {
        if center.iter().chain(size.iter()).any(|v| !v.is_finite()) {
            return Err(DockError::Config(
                "search box center and size must be finite".to_string(),
            ));
        }
        if size.iter().any(|s| *s <= 0.0) {
            return Err(DockError::Config(format!(
                "search box size must be positive, got {:?}",
                size
            )));
        }
        Ok(Self { center, size })
    }
}

impl Default for SearchBox {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            size: DEFAULT_BOX_SIZE,
        }
    }
}

impl fmt::Display for SearchBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "center=({}, {}, {}) size=({}, {}, {})",
            self.center[0], self.center[1], self.center[2], self.size[0], self.size[1], self.size[2]
        )
    }
}

/// A stateful docking engine session.
///
/// Energies are in kcal/mol; the first element is the total.
#[async_trait]
pub trait DockingEngine: Send {
    /// Loads the receptor, replacing any previous one.
    async fn set_receptor(&mut self, path: &Path) -> Result<()>;

    /// Loads the ligand and makes its input coordinates the current pose.
    async fn set_ligand_from_file(&mut self, path: &Path) -> Result<()>;

    /// Prepares the scoring grid for `search_box`.
    async fn compute_maps(&mut self, search_box: &SearchBox) -> Result<()>;

    /// Scores the current pose.
    async fn score(&mut self) -> Result<Vec<f64>>;

    /// Locally minimizes the current pose and makes the result current.
    async fn optimize(&mut self) -> Result<Vec<f64>>;

    /// Writes the current pose.
    async fn write_pose(&mut self, path: &Path, overwrite: bool) -> Result<()>;

    /// Runs the full pose search.
    async fn dock(&mut self, exhaustiveness: u32, n_poses: u32) -> Result<()>;

    /// Writes up to `n_poses` ranked poses from the last search.
    async fn write_poses(&mut self, path: &Path, n_poses: u32, overwrite: bool) -> Result<()>;
}
