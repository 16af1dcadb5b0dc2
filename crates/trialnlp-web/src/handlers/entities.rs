//! Entities tab: mention totals, mentions per type and the mention table.

use axum::{extract::State, response::Html};

use trialnlp_ner::entity_aggregator::label_group_counts;

use crate::render::charts::bar_chart;
use crate::render::{info_box, page, table, Frame, EMPTY_SESSION};
use crate::state::SharedState;

const TAB: &str = "entities";

/// Display names for the visible mention columns; raw label, score and
/// hash stay out of the table.
const COLUMNS: [&str; 6] = ["NCT Id", "Entity in the text", "Entity normalized", "Label group", "Start", "End"];

/// GET /entities
pub async fn entities_page(State(state): State<SharedState>) -> Html<String> {
    let session = state.session.read().await;
    let frame = Frame::new(&session, &state.config);
    if !session.has_trials() {
        return Html(page(&frame, TAB, &info_box(EMPTY_SESSION)));
    }
    if session.entities.is_empty() {
        return Html(page(&frame, TAB, &info_box("No entities yet. Fetch trials to run NER.")));
    }

    let counts = label_group_counts(&session.entities);
    let limit = state.config.display.entity_table_limit;
    let rows = table(
        &COLUMNS,
        session.entities.iter().take(limit).map(|m| {
            vec![
                m.nct_id.clone(),
                m.entity_text.clone(),
                m.entity_norm.clone(),
                m.label_group.to_string(),
                m.start.to_string(),
                m.end.to_string(),
            ]
        }),
    );

    let body = format!(
        r#"<h2 class="section-title">Entities</h2>
<p>Total entity mentions: <strong>{}</strong></p>
<div class="chart-wrap">{}</div>
{rows}"#,
        thousands(session.entities.len()),
        bar_chart("entity-types", &counts),
    );

    Html(page(&frame, TAB, &body))
}

/// `12345` → `12,345`
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::thousands;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }
}
