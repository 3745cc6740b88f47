//! End-to-end workflow: gene symbols + raw ligand -> docking results.

use std::path::{Path, PathBuf};

use adock_common::{DockError, Result};
use tracing::{info, warn};

use crate::batch::{BatchReport, BatchRunner, BindingSite, DockingParams, FailurePolicy, InputSet};
use crate::engine::DockingEngine;
use crate::prep::{PrepTool, ReceptorJob};
use crate::structure::StructureFetcher;

pub struct Workflow {
    fetcher: StructureFetcher,
    prep: PrepTool,
    params: DockingParams,
    policy: FailurePolicy,
    work_dir: PathBuf,
}

impl Workflow {
    /// Prepared inputs are written under `work_dir`.
    pub fn new<P: AsRef<Path>>(
        fetcher: StructureFetcher,
        prep: PrepTool,
        params: DockingParams,
        work_dir: P,
    ) -> Self {
        Self {
            fetcher,
            prep,
            params,
            policy: FailurePolicy::default(),
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn prepared_ligand_dir(&self) -> PathBuf {
        self.work_dir.join("prepared_ligands")
    }

    pub fn prepared_receptor_dir(&self) -> PathBuf {
        self.work_dir.join("prepared_receptors")
    }

    /// Fetch, prepare and dock `ligand` against the predicted structure of
    /// every gene in `genes`.
    pub async fn run<E: DockingEngine>(
        &self,
        engine: E,
        genes: &[String],
        ligand: &Path,
        output_dir: &Path,
    ) -> Result<BatchReport> {
        if genes.is_empty() {
            return Err(DockError::Config(
                "no genes provided for structure retrieval".to_string(),
            ));
        }
        self.params.validate()?;
        info!("Running docking workflow for {} gene(s)", genes.len());

        // Step 1: predicted structures
        let structures = self.fetcher.fetch_genes(genes).await;
        if structures.is_empty() {
            return Err(DockError::RemoteLookupFailure(
                "no receptor structure could be retrieved".to_string(),
            ));
        }

        // Step 2: preparation
        let ligand_stem = file_stem(ligand);
        let prepared_ligand = self
            .prep
            .prepare_ligand(
                ligand,
                &self.prepared_ligand_dir().join(format!("{}.pdbqt", ligand_stem)),
            )
            .await?;

        // Predicted structures always use the built-in site during preparation.
        let jobs: Vec<ReceptorJob> = structures
            .iter()
            .map(|structure| ReceptorJob {
                input: structure.clone(),
                output_prefix: self.prepared_receptor_dir().join(file_stem(structure)),
                site: BindingSite::Default,
            })
            .collect();
        let prepared_receptors = self.prep.prepare_receptors(&jobs).await;
        if prepared_receptors.len() < jobs.len() {
            warn!(
                "{} of {} receptors could not be prepared",
                jobs.len() - prepared_receptors.len(),
                jobs.len()
            );
        }

        let receptors = match prepared_receptors.as_slice() {
            [] => {
                return Err(DockError::ExternalToolFailure {
                    tool: self.prep.receptor_tool.display().to_string(),
                    status: "no receptor prepared".to_string(),
                    stderr: String::new(),
                })
            }
            [single] => InputSet::File(single.clone()),
            _ => InputSet::Files(prepared_receptors.clone()),
        };

        // Step 3: docking
        let mut runner = BatchRunner::new(engine, self.params).with_policy(self.policy);
        runner
            .run(&InputSet::File(prepared_ligand), &receptors, output_dir, None)
            .await
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::FetcherSettings;
    use crate::vina::{VinaCliEngine, VinaSettings};
    use tempfile::tempdir;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/raw/aspirin.sdf")), "aspirin");
        assert_eq!(file_stem(Path::new("/raw/KRAS.pdb")), "KRAS");
    }

    #[tokio::test]
    async fn test_no_genes_is_config_error() {
        let dir = tempdir().unwrap();
        let fetcher = StructureFetcher::new(dir.path(), FetcherSettings::default()).unwrap();
        let workflow = Workflow::new(fetcher, PrepTool::default(), DockingParams::default(), dir.path());
        let engine = VinaCliEngine::new(VinaSettings::default()).unwrap();

        let err = workflow
            .run(engine, &[], Path::new("lig.sdf"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DockError::Config(_)));
    }

    #[tokio::test]
    async fn test_ligand_prep_failure_stops_workflow() {
        let dir = tempdir().unwrap();
        let receptors = dir.path().join("receptors");
        std::fs::create_dir_all(&receptors).unwrap();
        std::fs::write(receptors.join("KRAS.pdb"), "ATOM").unwrap();

        let fetcher = StructureFetcher::new(&receptors, FetcherSettings::default()).unwrap();
        let prep = PrepTool::new(dir.path().join("missing_ligand_tool"), dir.path().join("missing_receptor_tool"));
        let workflow = Workflow::new(fetcher, prep, DockingParams::default(), dir.path().join("work"));
        let engine = VinaCliEngine::new(VinaSettings::default()).unwrap();

        let err = workflow
            .run(engine, &["KRAS".to_string()], Path::new("lig.sdf"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, DockError::ExternalToolFailure { .. }));
    }
}
