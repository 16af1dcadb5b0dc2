use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::TrialNlpError;

/// An HTTP client that only talks to approved hosts.
///
/// Every outbound request of the dashboard goes through here: the trial
/// registry and the model hub, plus loopback for local stubs.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

const DEFAULT_DOMAINS: &[&str] = &[
    "clinicaltrials.gov",     // ClinicalTrials.gov v2 API
    "huggingface.co",         // HuggingFace Models
    "cdn-lfs.huggingface.co", // HuggingFace LFS
    "localhost",
    "127.0.0.1",
];

impl SandboxClient {
    /// Creates a client with the default allowlist and a 30 second timeout.
    pub fn new() -> Result<Self, TrialNlpError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TrialNlpError> {
        let allowlist = DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("trialnlp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // Exact match or subdomain of an allowed domain
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, TrialNlpError> {
        if !self.is_allowed(url) {
            return Err(TrialNlpError::Security(format!(
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
    fn test_registry_and_hub_allowed() {
        let c = SandboxClient::new().unwrap();
        assert!(c.is_allowed("https://clinicaltrials.gov/api/v2/studies"));
        assert!(c.is_allowed("https://huggingface.co/d4data/biomedical-ner-all"));
        assert!(c.is_allowed("https://www.clinicaltrials.gov/api/v2/studies"));
    }

    #[test]
    fn test_other_hosts_rejected() {
        let c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://evil.example.com/"));
        assert!(!c.is_allowed("https://notclinicaltrials.gov/"));
        assert!(!c.is_allowed("not a url"));
        assert!(matches!(
            c.get("https://evil.example.com/"),
            Err(TrialNlpError::Security(_))
        ));
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://mirror.internal/api"));
        c.allow_domain("mirror.internal");
        assert!(c.is_allowed("https://mirror.internal/api"));
    }
}
