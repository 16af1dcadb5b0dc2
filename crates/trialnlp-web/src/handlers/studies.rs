//! Studies tab: trial table, trial selector and highlighted trial text.

use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::handlers::TrialQuery;
use crate::render::annotate::annotate_text_html;
use crate::render::{escape, info_box, page, plain_text_block, table, trial_selector, Frame, EMPTY_SESSION};
use crate::state::SharedState;

const TAB: &str = "studies";

/// GET /studies
pub async fn studies_page(State(state): State<SharedState>, Query(q): Query<TrialQuery>) -> Html<String> {
    let mut session = state.session.write().await;
    let frame = Frame::new(&session, &state.config);
    let Some(trial) = session.select(TAB, q.nct.as_deref()) else {
        return Html(page(&frame, TAB, &info_box(EMPTY_SESSION)));
    };

    let listing = table(
        &["nct_id", "title", "overall_status", "phase", "study_type", "sponsor"],
        session.trials.iter().map(|t| {
            vec![
                t.nct_id.clone(),
                t.title.clone(),
                t.overall_status.clone(),
                t.phase.clone(),
                t.study_type.clone(),
                t.sponsor.clone(),
            ]
        }),
    );

    let details = table(
        &["Field", "Value"],
        [
            ("nct_id", trial.nct_id.clone()),
            ("overall_status", trial.overall_status.clone()),
            ("phase", trial.phase.clone()),
            ("study_type", trial.study_type.clone()),
            ("sponsor", trial.sponsor.clone()),
            ("conditions", trial.conditions.join("; ")),
            ("interventions", trial.interventions.join("; ")),
        ]
        .into_iter()
        .map(|(k, v)| vec![k.to_string(), v]),
    );

    let display = &state.config.display;
    let text = if session.entities.is_empty() {
        plain_text_block(&trial.text_used_trunc)
    } else {
        annotate_text_html(
            &trial.text_used_trunc,
            session.mentions_for(&trial.nct_id),
            display.show_entity_tags,
            display.max_annotated_entities,
        )
    };

    let body = format!(
        r#"
{listing}
<hr>
<h2 class="section-title">Trial detail</h2>
{selector}
<p class="trial-title"><strong>{title}</strong></p>
{details}
{text}
"#,
        selector = trial_selector("/studies", &session.trials, &trial.nct_id),
        title = escape(&trial.title),
    );

    Html(page(&frame, TAB, &body))
}
