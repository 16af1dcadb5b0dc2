//! Live ClinicalTrials.gov search.
//!
//! Run with: cargo test --package trialnlp-ingestion --test test_clinicaltrials_search -- --ignored --nocapture

use trialnlp_ingestion::{normalize_trials, ClinicalTrialsClient, TrialSource};

#[tokio::test]
#[ignore] // Requires network access
async fn test_search_diabetes() {
    let client = ClinicalTrialsClient::new().expect("client");

    let raw = client
        .search("diabetes", 10)
        .await
        .expect("ClinicalTrials.gov search failed");

    println!("Found {} studies", raw.len());
    assert!(!raw.is_empty(), "Should find at least one study");
    assert!(raw.len() <= 10);

    let trials = normalize_trials(&raw, true);
    assert_eq!(trials.len(), raw.len());
    for t in &trials {
        println!("{} | {} | {}", t.nct_id, t.overall_status, t.title);
        assert!(t.nct_id.starts_with("NCT"));
        assert!(t.text_used_trunc.chars().count() <= trialnlp_ingestion::MAX_TEXT_CHARS);
    }
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_search_pages_past_first_page() {
    let client = ClinicalTrialsClient::new().expect("client");
    let raw = client.search("cancer", 1200).await.expect("search failed");
    assert!(raw.len() > 1000, "expected a second page, got {}", raw.len());
    assert!(raw.len() <= 1200);
}
