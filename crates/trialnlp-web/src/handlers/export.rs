//! Export tab and CSV downloads.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use trialnlp_common::export::{entities_to_csv, trials_to_csv};

use crate::render::{escape, info_box, page, Frame, EMPTY_SESSION};
use crate::state::SharedState;

const TAB: &str = "export";

/// GET /export
pub async fn export_page(State(state): State<SharedState>) -> Html<String> {
    let session = state.session.read().await;
    let frame = Frame::new(&session, &state.config);
    if !session.has_trials() {
        return Html(page(&frame, TAB, &info_box(EMPTY_SESSION)));
    }

    let fetched = session
        .timing
        .fetched_at
        .map(|t| {
            format!(
                r#"<p class="text-muted">Snapshot of "{}" fetched {}</p>"#,
                escape(&session.timing.query),
                t.format("%Y-%m-%d %H:%M:%S UTC")
            )
        })
        .unwrap_or_default();
    let mut body = format!(
        r#"<h2 class="section-title">Export</h2>
{fetched}
<p><a class="btn btn-primary" href="/export/trials.csv" download="trials.csv">Download trials (CSV)</a> <span class="text-muted">{} rows</span></p>"#,
        session.trials.len()
    );
    if !session.entities.is_empty() {
        body.push_str(&format!(
            r#"<p><a class="btn btn-primary" href="/export/entities.csv" download="entities.csv">Download entities (CSV)</a> <span class="text-muted">{} rows</span></p>"#,
            session.entities.len()
        ));
    }

    Html(page(&frame, TAB, &body))
}

fn csv_download(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

/// GET /export/trials.csv
pub async fn trials_csv(State(state): State<SharedState>) -> Response {
    let session = state.session.read().await;
    match trials_to_csv(&session.trials) {
        Ok(csv) => csv_download("trials.csv", csv),
        Err(e) => {
            error!("Trial export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Export failed: {e}")).into_response()
        }
    }
}

/// GET /export/entities.csv
pub async fn entities_csv(State(state): State<SharedState>) -> Response {
    let session = state.session.read().await;
    if session.entities.is_empty() {
        return (StatusCode::NOT_FOUND, "No entities to export.").into_response();
    }
    match entities_to_csv(&session.entities) {
        Ok(csv) => csv_download("entities.csv", csv),
        Err(e) => {
            error!("Entity export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Export failed: {e}")).into_response()
        }
    }
}
