//! Inline entity highlighting for trial text.

use sha2::{Digest, Sha256};

use trialnlp_common::EntityMention;

use super::escape;

const TEXT_COLOR: &str = "#111111";

/// (background, border) for the three core label groups.
fn fixed_colors(label: &str) -> Option<(&'static str, &'static str)> {
    match label {
        "DISEASE" => Some(("#ffe3e3", "#d62728")),
        "DRUG" => Some(("#e3efff", "#1f77b4")),
        "GENE_PROTEIN" => Some(("#e6ffe6", "#2ca02c")),
        _ => None,
    }
}

const OTHER_PALETTE: [(&str, &str); 8] = [
    ("#fff3cd", "#b8860b"),
    ("#f3e5ff", "#6f42c1"),
    ("#e7f7ff", "#0aa2c0"),
    ("#ffe6f2", "#c2185b"),
    ("#e9ecef", "#495057"),
    ("#e8f5e9", "#1b5e20"),
    ("#fce4ec", "#ad1457"),
    ("#e3f2fd", "#1565c0"),
];

/// Palette slot derived from a hash of the label, stable across runs.
fn stable_bucket(label: &str, n: usize) -> usize {
    let digest = Sha256::digest(label.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    head as usize % n
}

pub fn colors_for_label(label: &str) -> (&'static str, &'static str) {
    let label = label.trim().to_uppercase();
    let label = if label.is_empty() { "ENTITY".to_string() } else { label };
    fixed_colors(&label).unwrap_or_else(|| OTHER_PALETTE[stable_bucket(&label, OTHER_PALETTE.len())])
}

/// Render `text` with the given mentions highlighted.
///
/// Spans outside the text or off a char boundary are ignored. Spans are
/// ordered by start (longest first), capped at `max_entities`, and any span
/// overlapping an earlier kept one is skipped.
pub fn annotate_text_html<'a, I>(text: &str, mentions: I, show_tag: bool, max_entities: usize) -> String
where
    I: IntoIterator<Item = &'a EntityMention>,
{
    if text.is_empty() {
        return "<div></div>".to_string();
    }
    let plain = || format!(r#"<div class="annotated">{}</div>"#, escape(text));

    let mut spans: Vec<(usize, usize, String)> = mentions
        .into_iter()
        .filter(|m| {
            m.end > m.start
                && m.end <= text.len()
                && text.is_char_boundary(m.start)
                && text.is_char_boundary(m.end)
        })
        .map(|m| (m.start, m.end, m.label_group.as_str().to_uppercase()))
        .collect();
    if spans.is_empty() {
        return plain();
    }

    spans.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
    spans.truncate(max_entities);

    let mut out = String::from(r#"<div class="annotated">"#);
    let mut cursor = 0;
    for (start, end, label) in spans {
        if start < cursor {
            continue;
        }
        out.push_str(&escape(&text[cursor..start]));

        let (bg, border) = colors_for_label(&label);
        let tag = if show_tag {
            format!(
                r#"<span class="entity-tag" style="border:1px solid {border}; color:{border};">{}</span>"#,
                escape(&label)
            )
        } else {
            String::new()
        };
        out.push_str(&format!(
            r#"<span class="entity" style="background:{bg}; border-bottom:2px solid {border}; color:{TEXT_COLOR};">{}{}</span>"#,
            escape(&text[start..end]),
            tag
        ));
        cursor = end;
    }
    out.push_str(&escape(&text[cursor..]));
    out.push_str("</div>");
    out
}
