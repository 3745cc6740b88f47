//! Configuration loading for ADock.
//! Reads adock.toml from the current directory or the path in ADOCK_CONFIG.

use std::path::{Path, PathBuf};

use adock_docking::batch::{
    BindingSite, DockingParams, FailurePolicy, DEFAULT_EXHAUSTIVENESS, DEFAULT_POSE_COUNT,
};
use adock_docking::prep::PrepTool;
use adock_docking::structure::{FetcherSettings, ALPHAFOLD_API_URL, DEFAULT_ORGANISM_ID, UNIPROT_API_URL};
use adock_docking::vina::VinaSettings;
use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV_VAR: &str = "ADOCK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "adock.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub docking: DockingConfig,
    #[serde(default)]
    pub preparation: PreparationConfig,
    #[serde(default)]
    pub structure: StructureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default = "default_scoring")]
    pub scoring: String,
    pub cpu: Option<u32>,
    pub seed: Option<i64>,
}

fn default_executable() -> String { "vina".to_string() }
fn default_scoring()    -> String { "vina".to_string() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            scoring: default_scoring(),
            cpu: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingConfig {
    #[serde(default = "default_exhaustiveness")]
    pub exhaustiveness: u32,
    #[serde(default = "default_pose_count")]
    pub pose_count: u32,
    #[serde(default = "bool_true")]
    pub use_default_site: bool,
    pub center: Option<[f64; 3]>,
    pub box_size: Option<[f64; 3]>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_exhaustiveness() -> u32 { DEFAULT_EXHAUSTIVENESS }
fn default_pose_count()     -> u32 { DEFAULT_POSE_COUNT }
fn bool_true()              -> bool { true }

impl Default for DockingConfig {
    fn default() -> Self {
        Self {
            exhaustiveness: default_exhaustiveness(),
            pose_count: default_pose_count(),
            use_default_site: true,
            center: None,
            box_size: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationConfig {
    #[serde(default = "default_ligand_tool")]
    pub ligand_tool: String,
    #[serde(default = "default_receptor_tool")]
    pub receptor_tool: String,
}

fn default_ligand_tool()   -> String { "mk_prepare_ligand.py".to_string() }
fn default_receptor_tool() -> String { "mk_prepare_receptor.py".to_string() }

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            ligand_tool: default_ligand_tool(),
            receptor_tool: default_receptor_tool(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    #[serde(default = "default_receptor_dir")]
    pub receptor_dir: String,
    #[serde(default = "default_uniprot_url")]
    pub uniprot_url: String,
    #[serde(default = "default_alphafold_url")]
    pub alphafold_url: String,
    #[serde(default = "default_organism_id")]
    pub organism_id: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_receptor_dir()  -> String { "./data/receptors".to_string() }
fn default_uniprot_url()   -> String { UNIPROT_API_URL.to_string() }
fn default_alphafold_url() -> String { ALPHAFOLD_API_URL.to_string() }
fn default_organism_id()   -> u32    { DEFAULT_ORGANISM_ID }
fn default_timeout_secs()  -> u64    { 30 }

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            receptor_dir: default_receptor_dir(),
            uniprot_url: default_uniprot_url(),
            alphafold_url: default_alphafold_url(),
            organism_id: default_organism_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}


impl Config {
    /// Load configuration from an explicit path, ADOCK_CONFIG, or adock.toml.
    ///
    /// Returns the built-in defaults when no file exists at the implicit
    /// locations; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(
                std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string()),
            ),
        };

        if !path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok((Self::default(), None));
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok((config, Some(path)))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn vina_settings(&self) -> VinaSettings {
        VinaSettings {
            executable: PathBuf::from(&self.engine.executable),
            scoring: self.engine.scoring.clone(),
            cpu: self.engine.cpu,
            seed: self.engine.seed,
        }
    }

    pub fn prep_tool(&self) -> PrepTool {
        PrepTool::new(&self.preparation.ligand_tool, &self.preparation.receptor_tool)
    }

    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            uniprot_url: self.structure.uniprot_url.clone(),
            alphafold_url: self.structure.alphafold_url.clone(),
            organism_id: self.structure.organism_id,
            timeout_secs: self.structure.timeout_secs,
        }
    }

    /// Docking parameters from the file, with explicit CLI values on top.
    ///
    /// Any explicit center or box size turns the default site off.
    pub fn docking_params(
        &self,
        center: Option<[f64; 3]>,
        box_size: Option<[f64; 3]>,
        exhaustiveness: Option<u32>,
        pose_count: Option<u32>,
    ) -> adock_common::Result<DockingParams> {
        let explicit = center.is_some() || box_size.is_some();
        let site = if explicit {
            BindingSite::resolve(false, center, box_size)?
        } else {
            BindingSite::resolve(
                self.docking.use_default_site,
                self.docking.center,
                self.docking.box_size,
            )?
        };

        let params = DockingParams {
            site,
            exhaustiveness: exhaustiveness.unwrap_or(self.docking.exhaustiveness),
            pose_count: pose_count.unwrap_or(self.docking.pose_count),
        };
        params.validate()?;
        Ok(params)
    }
}
