//! Predicted receptor structures from UniProt and AlphaFold DB.

use std::path::{Path, PathBuf};
use std::time::Duration;

use adock_common::sandbox::SandboxClient as Client;
use adock_common::{DockError, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

pub const UNIPROT_API_URL: &str = "https://rest.uniprot.org";
pub const ALPHAFOLD_API_URL: &str = "https://alphafold.ebi.ac.uk";

/// Human
pub const DEFAULT_ORGANISM_ID: u32 = 9606;

/// Endpoints and lookup options for [`StructureFetcher`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherSettings {
    pub uniprot_url: String,
    pub alphafold_url: String,
    pub organism_id: u32,
    pub timeout_secs: u64,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            uniprot_url: UNIPROT_API_URL.to_string(),
            alphafold_url: ALPHAFOLD_API_URL.to_string(),
            organism_id: DEFAULT_ORGANISM_ID,
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize)]
struct UniprotSearchResponse {
    #[serde(default)]
    results: Vec<UniprotEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniprotEntry {
    primary_accession: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphafoldPrediction {
    pdb_url: Option<String>,
}

/// Client for gene -> accession -> predicted structure lookups.
pub struct StructureFetcher {
    client: Client,
    settings: FetcherSettings,
    receptor_dir: PathBuf,
}

impl StructureFetcher {
    /// Create a fetcher that stores structures in `receptor_dir`.
    pub fn new<P: AsRef<Path>>(receptor_dir: P, settings: FetcherSettings) -> Result<Self> {
        let mut client = Client::with_timeout(Duration::from_secs(settings.timeout_secs))?;
        client.allow_url(&settings.uniprot_url)?;
        client.allow_url(&settings.alphafold_url)?;

        Ok(Self {
            client,
            settings,
            receptor_dir: receptor_dir.as_ref().to_path_buf(),
        })
    }

    pub fn receptor_dir(&self) -> &Path {
        &self.receptor_dir
    }

    /// Resolve a gene symbol to its reviewed UniProt accession.
    pub async fn accession_for_gene(&self, gene: &str) -> Result<String> {
        let url = format!("{}/uniprotkb/search", self.settings.uniprot_url.trim_end_matches('/'));
        let query = format!(
            "gene_exact:{} AND organism_id:{} AND reviewed:true",
            gene, self.settings.organism_id
        );
        debug!(gene, "Looking up UniProt accession");

        let resp = self
            .client
            .get(&url)?
            .query(&[
                ("query", query.as_str()),
                ("fields", "accession"),
                ("format", "json"),
                ("size", "1"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DockError::RemoteLookupFailure(format!(
                "UniProt search for {} returned {}",
                gene,
                resp.status()
            )));
        }

        let body = resp.text().await?;
        parse_accession(&body)?.ok_or_else(|| {
            DockError::RemoteLookupFailure(format!("no reviewed UniProt entry for gene {}", gene))
        })
    }

    /// Look up the download URL of the predicted model for `accession`.
    pub async fn structure_url(&self, accession: &str) -> Result<String> {
        let url = format!(
            "{}/api/prediction/{}",
            self.settings.alphafold_url.trim_end_matches('/'),
            accession
        );
        let resp = self.client.get(&url)?.send().await?;

        if !resp.status().is_success() {
            return Err(DockError::RemoteLookupFailure(format!(
                "AlphaFold lookup for {} returned {}",
                accession,
                resp.status()
            )));
        }

        let body = resp.text().await?;
        parse_structure_url(&body)?.ok_or_else(|| {
            DockError::RemoteLookupFailure(format!("no AlphaFold model for {}", accession))
        })
    }

    /// Download the predicted structure for `accession` as `{file_stem}.pdb`.
    pub async fn fetch_structure(&self, accession: &str, file_stem: &str) -> Result<PathBuf> {
        let file_path = self.receptor_dir.join(format!("{}.pdb", file_stem));

        if file_path.exists() {
            debug!("Structure for {} found in {}", accession, file_path.display());
            return Ok(file_path);
        }

        let download_url = self.structure_url(accession).await?;
        info!("Fetching AlphaFold structure for {} from {}", accession, download_url);
        let response = self.client.get(&download_url)?.send().await?;
        if !response.status().is_success() {
            return Err(DockError::RemoteLookupFailure(format!(
                "download of {} returned {}",
                download_url,
                response.status()
            )));
        }
        let content = response.bytes().await?;

        fs::create_dir_all(&self.receptor_dir).await?;
        fs::write(&file_path, content).await?;

        Ok(file_path)
    }

    /// Gene symbol -> `{receptor_dir}/{GENE}.pdb`.
    pub async fn fetch_gene(&self, gene: &str) -> Result<PathBuf> {
        let gene = gene.trim().to_uppercase();
        if gene.is_empty() {
            return Err(DockError::Config("empty gene symbol".to_string()));
        }
        let cached = self.receptor_dir.join(format!("{}.pdb", gene));
        if cached.exists() {
            debug!("Structure for {} found in {}", gene, cached.display());
            return Ok(cached);
        }

        let accession = self.accession_for_gene(&gene).await?;
        info!(gene = %gene, accession = %accession, "Resolved UniProt accession");
        self.fetch_structure(&accession, &gene).await
    }

    /// Fetch every gene, logging and skipping the ones that fail.
    pub async fn fetch_genes(&self, genes: &[String]) -> Vec<PathBuf> {
        let mut fetched = Vec::with_capacity(genes.len());
        for gene in genes {
            match self.fetch_gene(gene).await {
                Ok(path) => fetched.push(path),
                Err(e) => warn!("Skipping gene {}: {}", gene, e),
            }
        }
        fetched
    }
}

/// First `primaryAccession` of a UniProt search payload.
pub fn parse_accession(body: &str) -> Result<Option<String>> {
    let parsed: UniprotSearchResponse = serde_json::from_str(body)
        .map_err(|e| DockError::RemoteLookupFailure(format!("unparseable UniProt response: {}", e)))?;
    Ok(parsed.results.into_iter().next().map(|e| e.primary_accession))
}

/// First `pdbUrl` of an AlphaFold DB prediction payload.
pub fn parse_structure_url(body: &str) -> Result<Option<String>> {
    let parsed: Vec<AlphafoldPrediction> = serde_json::from_str(body).map_err(|e| {
        DockError::RemoteLookupFailure(format!("unparseable AlphaFold response: {}", e))
    })?;
    Ok(parsed.into_iter().find_map(|p| p.pdb_url))
}
