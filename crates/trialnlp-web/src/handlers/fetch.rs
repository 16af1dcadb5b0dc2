//! Fetch trials, normalize them and run NER, replacing the session.

use std::time::Instant;

use axum::{extract::State, response::Redirect, Form};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use trialnlp_ingestion::normalize_trials;

use crate::state::{Session, SharedState, Timing};

#[derive(Debug, Deserialize)]
pub struct FetchForm {
    pub query: Option<String>,
    pub max_results: Option<usize>,
}

/// POST /fetch
pub async fn fetch_submit(State(state): State<SharedState>, Form(form): Form<FetchForm>) -> Redirect {
    let fetch_cfg = &state.config.fetch;
    let query = form
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(fetch_cfg.default_query.as_str())
        .to_string();
    let max_results = fetch_cfg.clamp_max_results(form.max_results.unwrap_or(fetch_cfg.default_max_results));

    state.publish("fetch", format!("Fetching trials for \"{query}\"..."), 0);
    let t0 = Instant::now();
    let raw = match state.source.search(&query, max_results).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Fetch failed for {:?}: {}", query, e);
            let mut session = state.session.write().await;
            session.fetch_error = Some(format!("Fetch failed: {e}"));
            session.last_query = Some(query);
            session.last_max_results = Some(max_results);
            state.notify("error", format!("Fetch failed: {e}"));
            return Redirect::to("/studies");
        }
    };
    let trials = normalize_trials(&raw, fetch_cfg.include_detailed);
    let fetch_secs = t0.elapsed().as_secs_f64();

    let generation = {
        let mut session = state.session.write().await;
        let generation = session.generation + 1;
        *session = Session {
            trials: trials.clone(),
            timing: Timing {
                query: query.clone(),
                fetched_at: Some(Utc::now()),
                fetch_secs: Some(fetch_secs),
                ..Default::default()
            },
            last_query: Some(query),
            last_max_results: Some(max_results),
            generation,
            ..Default::default()
        };
        generation
    };
    info!("Loaded {} trials in {:.2}s", trials.len(), fetch_secs);
    state.publish(
        "ner",
        format!("Loaded {} trials in {:.2}s. Running BioMed NER...", trials.len(), fetch_secs),
        trials.len() as u64,
    );

    let pipeline = state.pipeline.clone();
    let t1 = Instant::now();
    let result = tokio::task::spawn_blocking(move || pipeline.run(&trials)).await;
    let ner_secs = t1.elapsed().as_secs_f64();

    let mut session = state.session.write().await;
    if session.generation != generation {
        // a newer fetch replaced the session while NER was running
        return Redirect::to("/studies");
    }
    match result {
        Ok(Ok(mentions)) => {
            info!("NER complete in {:.2}s ({} mentions)", ner_secs, mentions.len());
            state.publish(
                "complete",
                format!("NER complete in {:.2}s ({} mentions).", ner_secs, mentions.len()),
                mentions.len() as u64,
            );
            session.timing.ner_secs = Some(ner_secs);
            session.timing.n_entities = Some(mentions.len());
            session.entities = mentions;
        }
        Ok(Err(e)) => {
            error!("NER failed: {}", e);
            state.notify("error", format!("NER failed: {e}"));
            fail_ner(&mut session, e.to_string());
        }
        Err(e) => {
            error!("NER task panicked: {}", e);
            state.notify("error", format!("NER failed: {e}"));
            fail_ner(&mut session, e.to_string());
        }
    }

    Redirect::to("/studies")
}

fn fail_ner(session: &mut Session, reason: String) {
    session.entities.clear();
    session.timing.ner_secs = None;
    session.timing.n_entities = None;
    session.ner_error = Some(format!("NER failed: {reason}"));
}
