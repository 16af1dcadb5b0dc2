//! Trial NLP tab: one trial's highlighted text, type donut and entity table.

use axum::{
    extract::{Query, State},
    response::Html,
};

use trialnlp_ner::entity_aggregator::{label_group_counts, per_trial_entity_table};

use crate::handlers::TrialQuery;
use crate::render::annotate::annotate_text_html;
use crate::render::charts::donut_chart;
use crate::render::{info_box, page, plain_text_block, table, trial_selector, Frame, EMPTY_SESSION};
use crate::state::SharedState;

const TAB: &str = "trial-nlp";

/// GET /trial-nlp
pub async fn trial_nlp_page(State(state): State<SharedState>, Query(q): Query<TrialQuery>) -> Html<String> {
    let mut session = state.session.write().await;
    let frame = Frame::new(&session, &state.config);
    let Some(trial) = session.select(TAB, q.nct.as_deref()) else {
        return Html(page(&frame, TAB, &info_box(EMPTY_SESSION)));
    };
    let selector = trial_selector("/trial-nlp", &session.trials, &trial.nct_id);

    if session.entities.is_empty() {
        let body = format!(
            r#"<h2 class="section-title">Trial NLP</h2>{selector}{}"#,
            plain_text_block(&trial.text_used_trunc)
        );
        return Html(page(&frame, TAB, &body));
    }

    let display = &state.config.display;
    let annotated = annotate_text_html(
        &trial.text_used_trunc,
        session.mentions_for(&trial.nct_id),
        display.show_entity_tags,
        display.max_annotated_entities,
    );

    let counts = label_group_counts(session.mentions_for(&trial.nct_id));
    let donut = if counts.is_empty() {
        r#"<p class="text-muted">No entities for this trial.</p>"#.to_string()
    } else {
        donut_chart("trial-types", &counts)
    };

    let rows = per_trial_entity_table(&session.entities, &trial.nct_id);
    let entity_table = table(
        &["label_group", "entity_text", "entity_norm", "mentions"],
        rows.into_iter()
            .map(|r| vec![r.label_group, r.entity_text, r.entity_norm, r.mentions.to_string()]),
    );

    let body = format!(
        r#"<h2 class="section-title">Trial NLP</h2>
{selector}
<div class="two-col">
    <div class="col-main"><h3>Text</h3>{annotated}</div>
    <div class="col-side">
        <h3>Entity types</h3>{donut}
        <h3>Entities</h3>{entity_table}
    </div>
</div>"#
    );

    Html(page(&frame, TAB, &body))
}
