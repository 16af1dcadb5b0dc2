//! Chart.js configs for the co-occurrence heatmaps, the entity-type donut
//! and the mentions-per-type bar chart.
//!
//! Each chart is a `<canvas>` plus its config as inline JSON; `static/js/charts.js`
//! instantiates them. Heatmaps use the `chartjs-chart-matrix` controller and
//! get their cell colours here, so the page scripts stay data-free.

use std::collections::HashMap;

use serde_json::{json, Value};

use trialnlp_ner::entity_aggregator::{CooccurrenceCell, TypeCooccurrence, TypeCount};

use super::escape;

/// Sequential colour schemes for heatmap cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Viridis,
    Magma,
    Blues,
}

impl Scheme {
    fn stops(&self) -> &'static [(u8, u8, u8)] {
        match self {
            Scheme::Viridis => &[
                (68, 1, 84), (72, 40, 120), (62, 74, 137), (49, 104, 142), (38, 130, 142),
                (31, 158, 137), (53, 183, 121), (109, 205, 89), (180, 222, 44), (253, 231, 37),
            ],
            Scheme::Magma => &[
                (0, 0, 4), (28, 16, 68), (79, 18, 123), (129, 37, 129), (181, 54, 122),
                (229, 80, 100), (251, 135, 97), (254, 194, 135), (252, 253, 191),
            ],
            Scheme::Blues => &[
                (247, 251, 255), (198, 219, 239), (107, 174, 214), (33, 113, 181), (8, 48, 107),
            ],
        }
    }

    /// Colour at `t` in `[0, 1]`, linearly interpolated between stops.
    pub fn color(&self, t: f64) -> String {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let pos = t * (stops.len() - 1) as f64;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - i as f64;
        let (a, b) = (stops[i], stops[i + 1]);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

/// Category colours, assigned to labels in sorted order.
const TABLEAU20: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
    "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7",
    "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

fn category_colors(counts: &[TypeCount]) -> HashMap<&str, &'static str> {
    let mut labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();
    labels.into_iter().enumerate().map(|(i, l)| (l, TABLEAU20[i % TABLEAU20.len()])).collect()
}

/// Pixel height per heatmap row; the canvas grows with the row count.
const ROW_PX: usize = 26;
const AXIS_PX: usize = 170;

/// `<canvas>` plus its config. `<` is escaped inside the JSON so entity
/// text can never close the script element.
pub fn chart_canvas(id: &str, config: &Value, height_px: usize) -> String {
    let json = config.to_string().replace('<', "\\u003c");
    format!(
        r#"<div class="chart-box" style="height:{height_px}px"><canvas id="{id}" data-chart="{id}-config"></canvas></div><script type="application/json" id="{id}-config">{json}</script>"#,
        id = escape(id),
    )
}

struct Grid<'a> {
    rows: Vec<&'a str>,
    cols: Vec<&'a str>,
    cells: Vec<(usize, usize, usize)>,
}

fn grid_config(grid: &Grid<'_>, x_title: &str, y_title: &str, scheme: Scheme, overlay_min: usize) -> Value {
    let (min, max) = grid
        .cells
        .iter()
        .fold((usize::MAX, 0), |(lo, hi), &(_, _, v)| (lo.min(v), hi.max(v)));
    let scale = |v: usize| -> f64 {
        if max <= min {
            1.0
        } else {
            (v - min) as f64 / (max - min) as f64
        }
    };

    let data: Vec<Value> = grid
        .cells
        .iter()
        .map(|&(i, j, n)| json!({ "x": grid.cols[j], "y": grid.rows[i], "v": n }))
        .collect();
    let colors: Vec<String> = grid.cells.iter().map(|&(_, _, n)| scheme.color(scale(n))).collect();

    json!({
        "type": "matrix",
        "data": {
            "datasets": [{
                "label": "Trials",
                "data": data,
                "backgroundColor": colors,
                "borderWidth": 1,
                "borderColor": "rgba(255,255,255,0.6)",
            }]
        },
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": {
                "legend": { "display": false },
                "cellLabels": { "min": overlay_min },
                "matrixTooltip": { "xTitle": x_title, "yTitle": y_title },
            },
            "scales": {
                "x": {
                    "type": "category",
                    "labels": grid.cols,
                    "offset": true,
                    "title": { "display": true, "text": x_title },
                    "ticks": { "maxRotation": 60, "autoSkip": false },
                    "grid": { "display": false },
                },
                "y": {
                    "type": "category",
                    "labels": grid.rows,
                    "offset": true,
                    "title": { "display": true, "text": y_title },
                    "ticks": { "autoSkip": false },
                    "grid": { "display": false },
                },
            },
        },
    })
}

/// Chart.js matrix config for an entity co-occurrence table. Rows are
/// `left`, columns `right`, both in first-appearance order of `cells`.
/// Cells with at least `overlay_min` trials carry their count as text.
pub fn heatmap_config(
    cells: &[CooccurrenceCell],
    x_title: &str,
    y_title: &str,
    scheme: Scheme,
    overlay_min: usize,
) -> Value {
    let mut rows: Vec<&str> = Vec::new();
    let mut cols: Vec<&str> = Vec::new();
    let mut points = Vec::with_capacity(cells.len());
    for c in cells {
        let i = rows.iter().position(|r| *r == c.left).unwrap_or_else(|| {
            rows.push(&c.left);
            rows.len() - 1
        });
        let j = cols.iter().position(|r| *r == c.right).unwrap_or_else(|| {
            cols.push(&c.right);
            cols.len() - 1
        });
        points.push((i, j, c.n_trials));
    }
    grid_config(&Grid { rows, cols, cells: points }, x_title, y_title, scheme, overlay_min)
}

pub fn cooccurrence_heatmap(
    id: &str,
    cells: &[CooccurrenceCell],
    x_title: &str,
    y_title: &str,
    scheme: Scheme,
    overlay_min: usize,
) -> String {
    let config = heatmap_config(cells, x_title, y_title, scheme, overlay_min);
    let n_rows = config["options"]["scales"]["y"]["labels"].as_array().map_or(0, Vec::len);
    chart_canvas(id, &config, n_rows * ROW_PX + AXIS_PX)
}

/// Label group × label group matrix (Blues). Every non-zero count is overlaid.
pub fn type_matrix_config(matrix: &TypeCooccurrence) -> Value {
    let labels: Vec<&str> = matrix.labels.iter().map(String::as_str).collect();
    let mut cells = Vec::new();
    for (i, row) in matrix.counts.iter().enumerate() {
        for (j, &n) in row.iter().enumerate() {
            if n > 0 {
                cells.push((i, j, n));
            }
        }
    }
    grid_config(&Grid { rows: labels.clone(), cols: labels, cells }, "Entity type", "Entity type", Scheme::Blues, 1)
}

pub fn type_matrix_heatmap(id: &str, matrix: &TypeCooccurrence) -> String {
    chart_canvas(id, &type_matrix_config(matrix), matrix.labels.len() * ROW_PX * 2 + AXIS_PX)
}

/// Doughnut of mentions per entity type.
pub fn donut_config(counts: &[TypeCount]) -> Value {
    let colors = category_colors(counts);
    let slices: Vec<&TypeCount> = counts.iter().filter(|c| c.mentions > 0).collect();
    json!({
        "type": "doughnut",
        "data": {
            "labels": slices.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(),
            "datasets": [{
                "label": "Mentions",
                "data": slices.iter().map(|c| c.mentions).collect::<Vec<_>>(),
                "backgroundColor": slices.iter().map(|c| colors[c.label.as_str()]).collect::<Vec<_>>(),
                "borderWidth": 0,
            }]
        },
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "cutout": "60%",
            "plugins": { "legend": { "position": "right" } },
        },
    })
}

pub fn donut_chart(id: &str, counts: &[TypeCount]) -> String {
    chart_canvas(id, &donut_config(counts), 260)
}

/// Vertical bars of mentions per entity type, tallest first.
pub fn bar_config(counts: &[TypeCount]) -> Value {
    let colors = category_colors(counts);
    let mut sorted: Vec<&TypeCount> = counts.iter().collect();
    sorted.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.label.cmp(&b.label)));
    json!({
        "type": "bar",
        "data": {
            "labels": sorted.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(),
            "datasets": [{
                "label": "Mentions",
                "data": sorted.iter().map(|c| c.mentions).collect::<Vec<_>>(),
                "backgroundColor": sorted.iter().map(|c| colors[c.label.as_str()]).collect::<Vec<_>>(),
                "borderWidth": 0,
                "borderRadius": 4,
            }]
        },
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": { "legend": { "display": false } },
            "scales": {
                "y": { "beginAtZero": true, "title": { "display": true, "text": "Mentions" } },
                "x": { "grid": { "display": false }, "title": { "display": true, "text": "Entity type" } },
            },
        },
    })
}

pub fn bar_chart(id: &str, counts: &[TypeCount]) -> String {
    chart_canvas(id, &bar_config(counts), 340)
}
