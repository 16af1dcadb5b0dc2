//! ClinicalTrials.gov v2 API client.
//!
//! API docs: https://clinicaltrials.gov/data-api/api
//! Endpoint: https://clinicaltrials.gov/api/v2/studies
//!
//! Studies are mapped field by field from `protocolSection` into `RawStudy`:
//!   - nct_id        = identificationModule.nctId (or .id)
//!   - brief_title   = identificationModule.briefTitle (or .officialTitle)
//!   - phase         = designModule.phases joined with ", " (or .phase)
//!   - sponsor       = sponsorCollaboratorsModule.leadSponsor.name
//!   - interventions = armsInterventionsModule.interventions[*].name

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use trialnlp_common::config::FetchConfig;
use trialnlp_common::sandbox::SandboxClient as Client;
use trialnlp_common::{RawStudy, Result, TrialNlpError};

use super::TrialSource;

pub const CT_API_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// The API refuses page sizes above this.
const MAX_PAGE_SIZE: usize = 1000;

pub struct ClinicalTrialsClient {
    client: Client,
    base_url: String,
}

impl ClinicalTrialsClient {
    pub fn new() -> Result<Self> {
        Ok(Self { client: Client::new()?, base_url: CT_API_URL.to_string() })
    }

    /// A `base_url` pointing at a mirror gets its host added to the allowlist.
    pub fn from_config(cfg: &FetchConfig) -> Result<Self> {
        let mut client = Client::with_timeout(Duration::from_secs(cfg.timeout_secs))?;
        let url = Url::parse(&cfg.base_url)
            .map_err(|e| TrialNlpError::Config(format!("invalid fetch.base_url: {e}")))?;
        if let Some(host) = url.host_str() {
            client.allow_domain(host);
        }
        Ok(Self { client, base_url: cfg.base_url.clone() })
    }

    async fn fetch_page(
        &self,
        query: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<Value> {
        let page_size = page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("query.cond", query),
            ("pageSize",   &page_size),
            ("format",     "json"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let resp = self.client
            .get(&self.base_url)?
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrialNlpError::Api { status: status.as_u16(), body });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl TrialSource for ClinicalTrialsClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawStudy>> {
        let mut studies = Vec::new();
        let mut token: Option<String> = None;

        while studies.len() < max_results {
            let remaining = (max_results - studies.len()).min(MAX_PAGE_SIZE);
            let payload = self.fetch_page(query, remaining, token.as_deref()).await?;
            let (page, next) = parse_page(&payload);
            debug!(n = page.len(), has_next = next.is_some(), "ClinicalTrials.gov page retrieved");

            let empty = page.is_empty();
            studies.extend(page.into_iter().take(remaining));

            match next {
                Some(t) if !empty => token = Some(t),
                _ => break,
            }
        }

        debug!(n = studies.len(), "ClinicalTrials.gov studies retrieved");
        Ok(studies)
    }
}

/// Map one API response page into studies plus the next page token.
pub fn parse_page(payload: &Value) -> (Vec<RawStudy>, Option<String>) {
    let studies = payload["studies"]
        .as_array()
        .map(|arr| arr.iter().map(parse_study).collect())
        .unwrap_or_default();
    let next = payload["nextPageToken"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(String::from);
    (studies, next)
}

/// Straight field mapping of a single study; missing modules yield `None`s.
pub fn parse_study(study: &Value) -> RawStudy {
    let proto = &study["protocolSection"];
    let id_mod = &proto["identificationModule"];
    let status_mod = &proto["statusModule"];
    let design_mod = &proto["designModule"];
    let sponsor_mod = &proto["sponsorCollaboratorsModule"];
    let cond_mod = &proto["conditionsModule"];
    let arms_mod = &proto["armsInterventionsModule"];
    let desc_mod = &proto["descriptionModule"];

    let nct_id = non_empty_str(&id_mod["nctId"]).or_else(|| non_empty_str(&id_mod["id"]));
    let brief_title = non_empty_str(&id_mod["briefTitle"])
        .or_else(|| non_empty_str(&id_mod["officialTitle"]));

    // phases is a list in current payloads, a plain string in some older ones
    let phase = match &design_mod["phases"] {
        Value::Array(phases) => {
            let joined = phases
                .iter()
                .filter_map(scalar_to_string)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Some(joined).filter(|s| !s.is_empty())
        }
        other => non_empty_str(other),
    }
    .or_else(|| non_empty_str(&design_mod["phase"]));

    let interventions = arms_mod["interventions"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|it| it["name"].as_str())
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    RawStudy {
        nct_id,
        brief_title,
        overall_status: non_empty_str(&status_mod["overallStatus"]),
        phase,
        study_type: non_empty_str(&design_mod["studyType"]),
        sponsor: non_empty_str(&sponsor_mod["leadSponsor"]["name"]),
        conditions: as_list(&cond_mod["conditions"]),
        interventions,
        brief_summary: text_block(&desc_mod["briefSummary"]),
        detailed_description: text_block(&desc_mod["detailedDescription"]),
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty_str(v: &Value) -> Option<String> {
    scalar_to_string(v).filter(|s| !s.is_empty())
}

/// Accept a list, a single string, or a scalar; trim and drop blanks.
fn as_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => non_empty_str(other).into_iter().collect(),
    }
}

/// Description fields are plain strings in v2, `{ "textBlock": ... }` in the legacy shape.
fn text_block(v: &Value) -> Option<String> {
    let raw = v.as_str().or_else(|| v["textBlock"].as_str())?;
    let cleaned = clean_text(raw);
    Some(cleaned).filter(|s| !s.is_empty())
}

/// CRLF → LF, trim, collapse runs of 3+ newlines to a single blank line.
pub fn clean_text(s: &str) -> String {
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    let re = BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));
    let s = s.replace("\r\n", "\n");
    re.replace_all(s.trim(), "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "studies": [
                {
                    "protocolSection": {
                        "identificationModule": {
                            "nctId": "NCT05000001",
                            "briefTitle": "Metformin in Type 2 Diabetes"
                        },
                        "statusModule": { "overallStatus": "RECRUITING" },
                        "designModule": {
                            "studyType": "INTERVENTIONAL",
                            "phases": ["PHASE2", "", "PHASE3"]
                        },
                        "sponsorCollaboratorsModule": { "leadSponsor": { "name": "Acme Pharma" } },
                        "conditionsModule": { "conditions": ["Type 2 Diabetes", "  ", "Obesity "] },
                        "armsInterventionsModule": {
                            "interventions": [
                                { "type": "DRUG", "name": "Metformin" },
                                { "type": "OTHER" },
                                { "name": " Placebo " }
                            ]
                        },
                        "descriptionModule": {
                            "briefSummary": "  First line.\r\n\r\n\r\n\r\nSecond line.  ",
                            "detailedDescription": "Details."
                        }
                    }
                },
                {
                    "protocolSection": {
                        "identificationModule": {
                            "id": "NCT05000002",
                            "officialTitle": "Official only"
                        },
                        "designModule": { "phase": "PHASE1" },
                        "conditionsModule": { "conditions": "Asthma" },
                        "descriptionModule": {
                            "briefSummary": { "textBlock": "Legacy summary" }
                        }
                    }
                },
                {}
            ],
            "nextPageToken": "abc123"
        })
    }

    #[test]
    fn test_parse_page_keeps_one_record_per_study() {
        let (studies, next) = parse_page(&sample_payload());
        assert_eq!(studies.len(), 3);
        assert_eq!(next.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_parse_study_field_mapping() {
        let (studies, _) = parse_page(&sample_payload());
        let s = &studies[0];
        assert_eq!(s.nct_id.as_deref(), Some("NCT05000001"));
        assert_eq!(s.brief_title.as_deref(), Some("Metformin in Type 2 Diabetes"));
        assert_eq!(s.overall_status.as_deref(), Some("RECRUITING"));
        assert_eq!(s.phase.as_deref(), Some("PHASE2, PHASE3"));
        assert_eq!(s.study_type.as_deref(), Some("INTERVENTIONAL"));
        assert_eq!(s.sponsor.as_deref(), Some("Acme Pharma"));
        assert_eq!(s.conditions, vec!["Type 2 Diabetes", "Obesity"]);
        assert_eq!(s.interventions, vec!["Metformin", "Placebo"]);
        assert_eq!(s.brief_summary.as_deref(), Some("First line.\n\nSecond line."));
        assert_eq!(s.detailed_description.as_deref(), Some("Details."));
    }

    #[test]
    fn test_parse_study_fallbacks() {
        let (studies, _) = parse_page(&sample_payload());
        let s = &studies[1];
        assert_eq!(s.nct_id.as_deref(), Some("NCT05000002"));
        assert_eq!(s.brief_title.as_deref(), Some("Official only"));
        assert_eq!(s.phase.as_deref(), Some("PHASE1"));
        assert_eq!(s.conditions, vec!["Asthma"]);
        assert_eq!(s.brief_summary.as_deref(), Some("Legacy summary"));
        assert!(s.detailed_description.is_none());

        assert_eq!(studies[2], RawStudy::default());
    }

    #[test]
    fn test_missing_studies_array_is_empty() {
        let (studies, next) = parse_page(&json!({ "nextPageToken": "" }));
        assert!(studies.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("a\r\nb"), "a\nb");
        assert_eq!(clean_text("\n\na\n\n\n\n\nb\n"), "a\n\nb");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_from_config_rejects_bad_base_url() {
        let cfg = FetchConfig { base_url: "not a url".into(), ..Default::default() };
        assert!(matches!(ClinicalTrialsClient::from_config(&cfg), Err(TrialNlpError::Config(_))));

        let mirror = FetchConfig { base_url: "http://ctgov-mirror.lan/api/v2/studies".into(), ..Default::default() };
        assert!(ClinicalTrialsClient::from_config(&mirror).is_ok());
    }
}
