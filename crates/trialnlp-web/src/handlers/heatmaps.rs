//! Heatmaps tab: entity co-occurrence across trials.

use axum::{extract::State, response::Html};

use trialnlp_common::LabelGroup;
use trialnlp_ner::entity_aggregator::{build_cooccurrence_long, type_cooccurrence};

use crate::render::charts::{cooccurrence_heatmap, type_matrix_heatmap, Scheme};
use crate::render::{info_box, page, Frame, EMPTY_SESSION};
use crate::state::SharedState;

const TAB: &str = "heatmaps";

/// GET /heatmaps
pub async fn heatmaps_page(State(state): State<SharedState>) -> Html<String> {
    let session = state.session.read().await;
    let frame = Frame::new(&session, &state.config);
    if !session.has_trials() {
        return Html(page(&frame, TAB, &info_box(EMPTY_SESSION)));
    }
    if session.entities.is_empty() {
        return Html(page(&frame, TAB, &info_box("Fetch trials to run NER and generate heatmaps.")));
    }

    let display = &state.config.display;
    let section = |id: &str, right: LabelGroup, title: &str, x_title: &str, scheme: Scheme| {
        let cells = build_cooccurrence_long(
            &session.entities,
            &LabelGroup::Disease,
            &right,
            display.heatmap_top_n,
            display.heatmap_top_n,
        );
        let chart = if cells.is_empty() {
            "<p>No co-occurrences found.</p>".to_string()
        } else {
            cooccurrence_heatmap(id, &cells, x_title, "Disease", scheme, display.overlay_numbers_min)
        };
        format!(r#"<h2 class="section-title">{title}</h2><div class="chart-wrap">{chart}</div>"#)
    };

    let matrix = type_cooccurrence(&session.entities);
    let body = format!(
        r#"{}<hr>{}<hr><h2 class="section-title">Entity type co-occurrence</h2><p class="text-muted">Trials in which both entity types appear.</p><div class="chart-wrap">{}</div>"#,
        section("disease-drug", LabelGroup::Drug, "Disease × Drug", "Drug", Scheme::Viridis),
        section("disease-gene", LabelGroup::GeneProtein, "Disease × Gene/Protein", "Gene/Protein", Scheme::Magma),
        type_matrix_heatmap("type-matrix", &matrix),
    );

    Html(page(&frame, TAB, &body))
}
