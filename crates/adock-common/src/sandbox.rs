use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::error::DockError;

/// Hosts the structure lookups are expected to talk to.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "rest.uniprot.org",    // UniProt gene -> accession
    "alphafold.ebi.ac.uk", // AlphaFold DB predictions
];

/// An HTTP client that only allows requests to approved domains.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a 30 second timeout.
    pub fn new() -> Result<Self, DockError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DockError> {
        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("adock/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of a configured base URL.
    pub fn allow_url(&mut self, url: &str) -> Result<(), DockError> {
        let parsed = Url::parse(url)
            .map_err(|e| DockError::Config(format!("invalid URL {}: {}", url, e)))?;
        match parsed.host_str() {
            Some(host) => {
                self.allow_domain(host);
                Ok(())
            }
            None => Err(DockError::Config(format!("URL has no host: {}", url))),
        }
    }

    /// True when the URL's host is an allowed domain or one of its subdomains.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_owned)) else {
            return false;
        };
        self.allowlist.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// GET request builder for an allowlisted URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, DockError> {
        if !self.is_allowed(url) {
            warn!(url, "Request refused: domain not in allowlist");
            return Err(DockError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://rest.uniprot.org/uniprotkb/search?query=x"));
        assert!(client.is_allowed("https://alphafold.ebi.ac.uk/api/prediction/P01116"));
        assert!(!client.is_allowed("https://example.com/file.pdb"));
        assert!(!client.is_allowed("not a url"));
    }

    #[test]
    fn test_get_rejects_unknown_host() {
        let client = SandboxClient::new().unwrap();
        let err = client.get("https://evil.example.org/").unwrap_err();
        assert!(matches!(err, DockError::Security(_)));
    }

    #[test]
    fn test_allow_url_adds_host() {
        let mut client = SandboxClient::new().unwrap();
        client.allow_url("http://127.0.0.1:8080/api").unwrap();
        assert!(client.is_allowed("http://127.0.0.1:8080/api/prediction/P1"));
        assert!(client.allow_url("::nonsense").is_err());
    }
}
