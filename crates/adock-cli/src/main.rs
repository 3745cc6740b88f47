//! ADock: batch molecular docking around AutoDock Vina.
//! Entry point for the `adock` binary.

mod config;

use std::path::{Path, PathBuf};

use adock_docking::batch::{BatchReport, BatchRunner, BindingSite, FailurePolicy, InputSet};
use adock_docking::pipeline::Workflow;
use adock_docking::structure::StructureFetcher;
use adock_docking::vina::VinaCliEngine;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "adock", version, about = "Batch ligand-receptor docking with AutoDock Vina")]
struct Cli {
    /// Configuration file (defaults to $ADOCK_CONFIG or ./adock.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging for the docking library
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dock ligand(s) against receptor(s) and write a results CSV
    Dock(DockArgs),
    /// Convert a ligand to PDBQT with the ligand preparation tool
    PrepareLigand {
        #[arg(short = 'i', long)]
        input: PathBuf,
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
    /// Convert a receptor to PDBQT and write its docking box
    PrepareReceptor {
        #[arg(short = 'i', long)]
        input: PathBuf,
        /// Output prefix; the receptor is written to PREFIX.pdbqt
        #[arg(short = 'o', long)]
        output: PathBuf,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Download predicted structures for gene symbols
    Fetch {
        #[arg(long = "gene", required = true)]
        genes: Vec<String>,
        #[arg(long)]
        receptor_dir: Option<PathBuf>,
    },
    /// Fetch, prepare and dock in one go
    Workflow {
        #[arg(long = "gene", required = true)]
        genes: Vec<String>,
        /// Raw ligand file (SDF, MOL2, ...)
        #[arg(long)]
        ligand: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        /// Where prepared inputs are written
        #[arg(long, default_value = "./data")]
        work_dir: PathBuf,
        #[arg(long)]
        continue_on_failure: bool,
    },
}

#[derive(Args, Debug)]
struct DockArgs {
    #[arg(long, conflicts_with = "ligand_dir", required_unless_present = "ligand_dir")]
    ligand: Option<PathBuf>,
    #[arg(long)]
    ligand_dir: Option<PathBuf>,
    #[arg(long, conflicts_with = "receptor_dir", required_unless_present = "receptor_dir")]
    receptor: Option<PathBuf>,
    #[arg(long)]
    receptor_dir: Option<PathBuf>,
    #[arg(long)]
    output_dir: PathBuf,
    #[command(flatten)]
    site: SiteArgs,
    #[arg(long)]
    exhaustiveness: Option<u32>,
    /// Number of poses to keep
    #[arg(long)]
    poses: Option<u32>,
    /// Record failed pairs and keep going instead of aborting
    #[arg(long)]
    continue_on_failure: bool,
    /// Results file name inside the output directory
    #[arg(long)]
    csv: Option<String>,
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// Search box center, e.g. --center 10.5,-2,3.25
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    center: Option<Vec<f64>>,
    /// Search box edge lengths, e.g. --box-size 20,20,20
    #[arg(long, value_delimiter = ',')]
    box_size: Option<Vec<f64>>,
}

impl SiteArgs {
    fn center(&self) -> anyhow::Result<Option<[f64; 3]>> {
        self.center.as_deref().map(|v| triple("--center", v)).transpose()
    }

    fn box_size(&self) -> anyhow::Result<Option<[f64; 3]>> {
        self.box_size.as_deref().map(|v| triple("--box-size", v)).transpose()
    }
}

fn triple(flag: &str, values: &[f64]) -> anyhow::Result<[f64; 3]> {
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("{} takes exactly three values, got {}", flag, values.len()))
}

fn input_set(file: Option<PathBuf>, dir: Option<PathBuf>) -> anyhow::Result<InputSet> {
    match (file, dir) {
        (Some(file), None) => Ok(InputSet::File(file)),
        (None, Some(dir)) => Ok(InputSet::Directory(dir)),
        _ => anyhow::bail!("pass exactly one of the file or directory options"),
    }
}

fn policy(continue_on_failure: bool, config: &Config) -> FailurePolicy {
    if continue_on_failure {
        FailurePolicy::Continue
    } else {
        config.docking.failure_policy
    }
}

fn summarize(report: &BatchReport) {
    for r in &report.results {
        info!("{} / {}: {} kcal/mol", r.ligand_id, r.receptor_id, r.binding_affinity);
    }
    for f in &report.failures {
        warn!("Failed: {} / {}: {}", f.ligand.display(), f.receptor.display(), f.error);
    }
    info!("Results saved to {}", report.csv_path.display());
}

async fn dock(args: DockArgs, config: &Config) -> anyhow::Result<()> {
    // Parameter errors surface before any file is touched.
    let params = config.docking_params(
        args.site.center()?,
        args.site.box_size()?,
        args.exhaustiveness,
        args.poses,
    )?;
    let ligands = input_set(args.ligand, args.ligand_dir)?;
    let receptors = input_set(args.receptor, args.receptor_dir)?;

    let engine = VinaCliEngine::new(config.vina_settings())?;
    let mut runner = BatchRunner::new(engine, params).with_policy(policy(args.continue_on_failure, config));
    let report = runner
        .run(&ligands, &receptors, &args.output_dir, args.csv.as_deref())
        .await?;

    summarize(&report);
    if !report.failures.is_empty() {
        warn!("{} pair(s) failed", report.failures.len());
    }
    Ok(())
}

async fn prepare_receptor(input: &Path, output: &Path, site: &SiteArgs, config: &Config) -> anyhow::Result<()> {
    let (center, box_size) = (site.center()?, site.box_size()?);
    let explicit = center.is_some() || box_size.is_some();
    let site = BindingSite::resolve(!explicit, center, box_size)?;
    let prepared = config.prep_tool().prepare_receptor(input, output, &site).await?;
    info!("Prepared receptor written to {}", prepared.display());
    Ok(())
}

async fn fetch(genes: &[String], receptor_dir: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let receptor_dir = receptor_dir.unwrap_or_else(|| PathBuf::from(&config.structure.receptor_dir));
    let fetcher = StructureFetcher::new(&receptor_dir, config.fetcher_settings())?;
    let fetched = fetcher.fetch_genes(genes).await;
    for path in &fetched {
        info!("Structure saved: {}", path.display());
    }
    info!("{} of {} structures retrieved", fetched.len(), genes.len());
    Ok(())
}

async fn workflow(
    genes: &[String],
    ligand: &Path,
    output_dir: &Path,
    work_dir: &Path,
    continue_on_failure: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let params = config.docking_params(None, None, None, None)?;
    let fetcher = StructureFetcher::new(&config.structure.receptor_dir, config.fetcher_settings())?;
    let workflow = Workflow::new(fetcher, config.prep_tool(), params, work_dir)
        .with_policy(policy(continue_on_failure, config));

    let engine = VinaCliEngine::new(config.vina_settings())?;
    let report = workflow.run(engine, genes, ligand, output_dir).await?;
    summarize(&report);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "adock=debug,adock_docking=debug,info"
    } else {
        "adock=info,adock_docking=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let (config, loaded_from) = Config::load(cli.config.as_deref())?;
    match loaded_from {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No adock.toml found; using built-in defaults"),
    }

    match cli.command {
        Command::Dock(args) => dock(args, &config).await,
        Command::PrepareLigand { input, output } => {
            let prepared = config.prep_tool().prepare_ligand(&input, &output).await?;
            info!("Prepared ligand written to {}", prepared.display());
            Ok(())
        }
        Command::PrepareReceptor { input, output, site } => {
            prepare_receptor(&input, &output, &site, &config).await
        }
        Command::Fetch { genes, receptor_dir } => fetch(&genes, receptor_dir, &config).await,
        Command::Workflow {
            genes,
            ligand,
            output_dir,
            work_dir,
            continue_on_failure,
        } => workflow(&genes, &ligand, &output_dir, &work_dir, continue_on_failure, &config)
            .await
            .context("Docking workflow failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dock_with_site() {
        let cli = Cli::try_parse_from([
            "adock", "dock", "--ligand-dir", "ligs", "--receptor", "rec.pdbqt",
            "--output-dir", "out", "--center", "-0.3,5.2,1.5", "--box-size", "20,20,20",
            "--continue-on-failure",
        ])
        .unwrap();
        match cli.command {
            Command::Dock(args) => {
                assert_eq!(args.site.center().unwrap(), Some([-0.3, 5.2, 1.5]));
                assert_eq!(args.site.box_size().unwrap(), Some([20.0, 20.0, 20.0]));
                assert!(args.continue_on_failure);
                let ligands = input_set(args.ligand, args.ligand_dir).unwrap();
                assert_eq!(ligands, InputSet::Directory(PathBuf::from("ligs")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_dock_requires_one_ligand_source() {
        assert!(Cli::try_parse_from([
            "adock", "dock", "--receptor", "r.pdbqt", "--output-dir", "out",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "adock", "dock", "--ligand", "l.pdbqt", "--ligand-dir", "ligs",
            "--receptor", "r.pdbqt", "--output-dir", "out",
        ])
        .is_err());
    }

    #[test]
    fn test_triple() {
        assert_eq!(triple("--center", &[1.0, 2.0, 3.0]).unwrap(), [1.0, 2.0, 3.0]);
        assert!(triple("--center", &[1.0, 2.0]).is_err());
    }
}
