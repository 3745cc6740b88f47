//! Receptor x ligand batch docking.

use std::path::{Path, PathBuf};

use adock_common::{DockError, InputRole, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::docking::{Docker, DockingResult, DockingTask};
use crate::engine::{DockingEngine, SearchBox};
use crate::naming::{has_pdbqt_extension, trim_name, validate_input};
use crate::results::write_results;

pub const DEFAULT_EXHAUSTIVENESS: u32 = 32;
pub const DEFAULT_POSE_COUNT: u32 = 5;

/// Name of the results table when both inputs are directories.
pub const BATCH_RESULTS_FILE: &str = "docking_results.csv";

/// A single structure file or every `.pdbqt` file in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSet {
    File(PathBuf),
    Directory(PathBuf),
    /// An explicit list, named and ordered like a directory
    Files(Vec<PathBuf>),
}

impl InputSet {
    /// Picks [`InputSet::Directory`] for existing directories, a file otherwise.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            InputSet::Directory(path)
        } else {
            InputSet::File(path)
        }
    }

    pub fn is_directory(&self) -> bool {
        !matches!(self, InputSet::File(_))
    }

    /// The files this set stands for, sorted by name for directories.
    ///
    /// A single file is returned as-is; it is validated when docked.
    pub fn collect(&self, role: InputRole) -> Result<Vec<PathBuf>> {
        match self {
            InputSet::File(path) => Ok(vec![path.clone()]),
            InputSet::Files(paths) => Ok(paths.clone()),
            InputSet::Directory(dir) => {
                let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => DockError::InputNotFound {
                        role,
                        path: dir.clone(),
                    },
                    _ => DockError::Io(e),
                })?;

                let mut files = Vec::new();
                for entry in entries {
                    let path = entry?.path();
                    if path.is_file() && has_pdbqt_extension(&path) {
                        files.push(path);
                    }
                }
                files.sort();

                if files.is_empty() {
                    warn!(dir = %dir.display(), "No .pdbqt {} files found", role);
                }
                Ok(files)
            }
        }
    }
}

/// Where on the receptor to search.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BindingSite {
    /// The built-in site for predicted structures
    #[default]
    Default,
    Explicit(SearchBox),
}

impl BindingSite {
    /// Resolves the `use_default_site` flag against optional explicit values.
    ///
    /// With the flag off both `center` and `box_size` are required.
    pub fn resolve(
        use_default_site: bool,
        center: Option<[f64; 3]>,
        box_size: Option<[f64; 3]>,
    ) -> Result<Self> {
        if use_default_site {
            return Ok(BindingSite::Default);
        }
        match (center, box_size) {
            (Some(center), Some(size)) => Ok(BindingSite::Explicit(SearchBox::new(center, size)?)),
            _ => Err(DockError::Config(
                "center and box_size must both be provided when the default site is not used"
                    .to_string(),
            )),
        }
    }

    pub fn search_box(&self) -> SearchBox {
        match self {
            BindingSite::Default => SearchBox::default(),
            BindingSite::Explicit(b) => *b,
        }
    }
}

/// What to do when one pair fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch and return the error
    #[default]
    Abort,
    /// Record the failure and go on with the next pair
    Continue,
}

/// Parameters shared by every pair in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingParams {
    pub site: BindingSite,
    pub exhaustiveness: u32,
    pub pose_count: u32,
}

impl Default for DockingParams {
    fn default() -> Self {
        Self {
            site: BindingSite::Default,
            exhaustiveness: DEFAULT_EXHAUSTIVENESS,
            pose_count: DEFAULT_POSE_COUNT,
        }
    }
}

impl DockingParams {
    pub fn validate(&self) -> Result<()> {
        if self.exhaustiveness == 0 {
            return Err(DockError::Config("exhaustiveness must be at least 1".to_string()));
        }
        if self.pose_count == 0 {
            return Err(DockError::Config("pose_count must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// A pair that failed under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairFailure {
    pub ligand: PathBuf,
    pub receptor: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per docked pair, receptors outer, ligands inner
    pub results: Vec<DockingResult>,
    pub failures: Vec<PairFailure>,
    pub csv_path: PathBuf,
}

/// Docks every receptor x ligand combination through one engine session.
pub struct BatchRunner<E> {
    docker: Docker<E>,
    params: DockingParams,
    policy: FailurePolicy,
}

impl<E: DockingEngine> BatchRunner<E> {
    pub fn new(engine: E, params: DockingParams) -> Self {
        Self {
            docker: Docker::new(engine),
            params,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Docks all pairs and writes the results table into `output_dir`.
    ///
    /// `csv_name` overrides [`default_results_name`].
    pub async fn run(
        &mut self,
        ligands: &InputSet,
        receptors: &InputSet,
        output_dir: &Path,
        csv_name: Option<&str>,
    ) -> Result<BatchReport> {
        self.params.validate()?;

        // A bad single file fails every pair, so reject it before creating anything.
        if let InputSet::File(ligand) = ligands {
            validate_input(ligand, InputRole::Ligand)?;
        }
        if let InputSet::File(receptor) = receptors {
            validate_input(receptor, InputRole::Receptor)?;
        }

        let receptor_files = receptors.collect(InputRole::Receptor)?;
        let ligand_files = ligands.collect(InputRole::Ligand)?;
        tokio::fs::create_dir_all(output_dir).await?;

        let search_box = self.params.site.search_box();
        let total = receptor_files.len() * ligand_files.len();
        info!(
            receptors = receptor_files.len(),
            ligands = ligand_files.len(),
            site = %search_box,
            "Starting batch of {} docking runs",
            total
        );

        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for receptor in &receptor_files {
            for ligand in &ligand_files {
                let task = DockingTask {
                    ligand_path: ligand.clone(),
                    receptor_path: receptor.clone(),
                    search_box,
                    exhaustiveness: self.params.exhaustiveness,
                    pose_count: self.params.pose_count,
                    output_dir: output_dir.to_path_buf(),
                };

                match self.docker.dock(&task).await {
                    Ok(result) => results.push(result),
                    Err(e) => match self.policy {
                        FailurePolicy::Abort => return Err(e),
                        FailurePolicy::Continue => {
                            warn!(
                                ligand = %ligand.display(),
                                receptor = %receptor.display(),
                                "Skipping failed pair: {}",
                                e
                            );
                            failures.push(PairFailure {
                                ligand: ligand.clone(),
                                receptor: receptor.clone(),
                                error: e.to_string(),
                            });
                        }
                    },
                }
            }
        }

        let name = match csv_name {
            Some(name) => name.to_string(),
            None => default_results_name(ligands, receptors, &results),
        };
        let csv_path = output_dir.join(name);
        write_results(&csv_path, &results)?;

        if csv_path.exists() {
            info!(
                docked = results.len(),
                failed = failures.len(),
                "Results saved to {}",
                csv_path.display()
            );
        } else {
            error!("Results file {} was not created", csv_path.display());
        }

        Ok(BatchReport {
            results,
            failures,
            csv_path,
        })
    }
}

/// File name for a batch's results table.
///
/// Two single files give `{ligand}_{receptor}_docking_results.csv`. A receptor
/// directory is named after the first result's receptor and a ligand directory
/// after the first result's ligand; two directories (or a directory batch with
/// no results) give [`BATCH_RESULTS_FILE`].
pub fn default_results_name(
    ligands: &InputSet,
    receptors: &InputSet,
    results: &[DockingResult],
) -> String {
    let first = results.first();
    match (ligands, receptors) {
        (InputSet::File(ligand), InputSet::File(receptor)) => format!(
            "{}_{}_docking_results.csv",
            trim_name(ligand),
            trim_name(receptor)
        ),
        (InputSet::File(_), _) => match first {
            Some(r) => format!("{}_docking_results.csv", r.receptor_id),
            None => BATCH_RESULTS_FILE.to_string(),
        },
        (_, InputSet::File(_)) => match first {
            Some(r) => format!("{}_docking_results.csv", r.ligand_id),
            None => BATCH_RESULTS_FILE.to_string(),
        },
        _ => BATCH_RESULTS_FILE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn result(ligand: &str, receptor: &str) -> DockingResult {
        DockingResult {
            ligand_id: ligand.to_string(),
            receptor_id: receptor.to_string(),
            binding_affinity: "-7.0".to_string(),
            output_file: PathBuf::from(format!("{}_{}.pdbqt", ligand, receptor)),
        }
    }

    #[test]
    fn test_resolve_default_site() {
        let site = BindingSite::resolve(true, None, Some([10.0; 3])).unwrap();
        assert_eq!(site, BindingSite::Default);
        assert_eq!(site.search_box(), SearchBox::default());
    }

    #[test]
    fn test_resolve_explicit_site_requires_both_values() {
        assert!(matches!(
            BindingSite::resolve(false, Some([1.0, 2.0, 3.0]), None),
            Err(DockError::Config(_))
        ));
        assert!(matches!(
            BindingSite::resolve(false, None, Some([20.0; 3])),
            Err(DockError::Config(_))
        ));

        let site = BindingSite::resolve(false, Some([1.0, 2.0, 3.0]), Some([20.0; 3])).unwrap();
        assert_eq!(site.search_box().center, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_default_names() {
        let lig = InputSet::File(PathBuf::from("/l/aspirin.pdbqt"));
        let rec = InputSet::File(PathBuf::from("/r/KRAS.pdbqt"));
        let lig_dir = InputSet::Directory(PathBuf::from("/l"));
        let rec_dir = InputSet::Directory(PathBuf::from("/r"));
        let results = vec![result("aspirin", "EGFR"), result("ibuprofen", "KRAS")];

        assert_eq!(
            default_results_name(&lig, &rec, &[]),
            "aspirin_KRAS_docking_results.csv"
        );
        assert_eq!(
            default_results_name(&lig, &rec_dir, &results),
            "EGFR_docking_results.csv"
        );
        assert_eq!(
            default_results_name(&lig_dir, &rec, &results),
            "aspirin_docking_results.csv"
        );
        assert_eq!(
            default_results_name(&lig_dir, &rec_dir, &results),
            "docking_results.csv"
        );
        assert_eq!(default_results_name(&lig_dir, &rec, &[]), "docking_results.csv");
    }

    #[test]
    fn test_directory_enumeration_is_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["c.pdbqt", "a.pdbqt", "notes.txt", "b.pdbqt", "raw.pdb"] {
            std::fs::write(dir.path().join(name), "ATOM").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdbqt")).unwrap();

        let files = InputSet::Directory(dir.path().to_path_buf())
            .collect(InputRole::Ligand)
            .unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdbqt", "b.pdbqt", "c.pdbqt"]);
    }

    #[test]
    fn test_missing_directory_is_input_not_found() {
        let dir = tempdir().unwrap();
        let err = InputSet::Directory(dir.path().join("absent"))
            .collect(InputRole::Receptor)
            .unwrap_err();
        assert!(matches!(
            err,
            DockError::InputNotFound { role: InputRole::Receptor, .. }
        ));
    }

    #[test]
    fn test_explicit_list_keeps_order() {
        let files = vec![PathBuf::from("/r/z.pdbqt"), PathBuf::from("/r/a.pdbqt")];
        let set = InputSet::Files(files.clone());
        assert!(set.is_directory());
        assert_eq!(set.collect(InputRole::Receptor).unwrap(), files);
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        assert!(InputSet::from_path(dir.path()).is_directory());
        assert!(!InputSet::from_path(dir.path().join("x.pdbqt")).is_directory());
    }

    #[test]
    fn test_failure_policy_serde() {
        let policy: FailurePolicy = serde_json::from_str("\"continue\"").unwrap();
        assert_eq!(policy, FailurePolicy::Continue);
        assert_eq!(serde_json::to_string(&FailurePolicy::Abort).unwrap(), "\"abort\"");
    }

    #[test]
    fn test_params_validation() {
        assert!(DockingParams::default().validate().is_ok());
        let params = DockingParams {
            pose_count: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
