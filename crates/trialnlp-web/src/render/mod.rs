//! HTML rendering shared by every tab.
//!
//! Pages are assembled from `format!` fragments and wrapped in the embedded
//! `base.html` layout (sidebar fetch form, tab bar, status caption).

pub mod annotate;
pub mod charts;

use std::fmt::Write as _;
use std::sync::OnceLock;

use minijinja::{context, Environment, Value};
use tracing::error;

use trialnlp_common::config::{Config, MIN_RESULTS};
use trialnlp_common::Trial;

use crate::state::Session;

pub const APP_TITLE: &str = "Clinical Trials NLP Explorer";

/// Shown on every tab until a fetch has produced trials.
pub const EMPTY_SESSION: &str = "Fetch trials to begin.";

/// Tab slugs and titles, in display order.
pub const TABS: [(&str, &str); 5] = [
    ("studies", "Studies"),
    ("heatmaps", "Heatmaps"),
    ("trial-nlp", "Trial NLP"),
    ("entities", "Entities"),
    ("export", "Export"),
];

const TEMPLATES: [(&str, &str); 2] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("nav.html", include_str!("../../templates/nav.html")),
];

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            if let Err(e) = env.add_template(name, source) {
                error!("Template {} failed to parse: {}", name, e);
            }
        }
        env
    })
}

/// Sidebar and caption values for the page frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub query: String,
    pub max_results: usize,
    pub max_results_cap: usize,
    pub status: Option<String>,
    pub errors: Vec<String>,
}

impl Frame {
    pub fn new(session: &Session, config: &Config) -> Self {
        let mut errors = Vec::new();
        errors.extend(session.fetch_error.clone());
        errors.extend(session.ner_error.clone());
        Self {
            query: session.last_query.clone().unwrap_or_else(|| config.fetch.default_query.clone()),
            max_results: session.last_max_results.unwrap_or(config.fetch.default_max_results),
            max_results_cap: config.fetch.max_results_cap,
            status: status_caption(session),
            errors,
        }
    }
}

/// `Query: q • Trials: n • Fetch: x.xxs • NER: y.yys`, or nothing before a fetch.
pub fn status_caption(session: &Session) -> Option<String> {
    if !session.has_trials() {
        return None;
    }
    let timing = &session.timing;
    let mut parts = vec![format!("Query: {}", timing.query), format!("Trials: {}", session.trials.len())];
    if let Some(s) = timing.fetch_secs {
        parts.push(format!("Fetch: {s:.2}s"));
    }
    if let Some(s) = timing.ner_secs {
        parts.push(format!("NER: {s:.2}s"));
    }
    Some(parts.join(" • "))
}

/// Wrap a tab body in the page layout.
pub fn page(frame: &Frame, active: &str, body: &str) -> String {
    let title = TABS
        .iter()
        .find(|(slug, _)| *slug == active)
        .map(|(_, title)| *title)
        .unwrap_or(APP_TITLE);
    let tabs: Vec<Value> = TABS
        .iter()
        .map(|(slug, title)| context! { slug => slug, title => title, active => *slug == active })
        .collect();

    let ctx = context! {
        app_title => APP_TITLE,
        title => title,
        tabs => tabs,
        query => &frame.query,
        max_results => frame.max_results,
        min_results => MIN_RESULTS,
        max_results_cap => frame.max_results_cap,
        status => &frame.status,
        errors => &frame.errors,
        body => Value::from_safe_string(body.to_string()),
    };

    match environment().get_template("base.html").and_then(|t| t.render(ctx)) {
        Ok(html) => html,
        Err(e) => {
            error!("Layout render failed: {:#}", e);
            format!("<!DOCTYPE html><html><body><h1>{APP_TITLE}</h1>{body}</body></html>")
        }
    }
}

/// Escape text for HTML element and attribute content.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn info_box(message: &str) -> String {
    format!(r#"<div class="alert alert-info">{}</div>"#, escape(message))
}

/// A plain table; every cell is escaped.
pub fn table<I>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut html = String::from(r#"<div class="table-wrap"><table class="table"><thead><tr>"#);
    for h in headers {
        let _ = write!(html, "<th>{}</th>", escape(h));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    html
}

/// GET form with a trial drop-down that submits on change.
pub fn trial_selector(action: &str, trials: &[Trial], selected: &str) -> String {
    let mut options = String::new();
    for t in trials {
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            escape(&t.nct_id),
            if t.nct_id == selected { " selected" } else { "" },
            escape(&t.display_label()),
        );
    }
    format!(
        r#"<form method="get" action="{}" class="trial-select">
    <label for="nct">Select a trial</label>
    <select id="nct" name="nct" onchange="this.form.submit()">{}</select>
    <noscript><button type="submit" class="btn btn-outline btn-sm">Show</button></noscript>
</form>"#,
        escape(action),
        options
    )
}

/// Text with line breaks preserved, no highlighting.
pub fn plain_text_block(text: &str) -> String {
    format!(r#"<pre class="plain-text">{}</pre>"#, escape(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Timing;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"a" & 'b'</b>"#), "&lt;b&gt;&quot;a&quot; &amp; &#x27;b&#x27;&lt;/b&gt;");
    }

    #[test]
    fn test_status_caption() {
        let mut session = Session::default();
        assert!(status_caption(&session).is_none());

        session.trials = vec![Trial::default(), Trial::default()];
        session.timing = Timing {
            query: "asthma".into(),
            fetch_secs: Some(1.234),
            ner_secs: Some(0.5),
            n_entities: Some(3),
            ..Default::default()
        };
        assert_eq!(
            status_caption(&session).unwrap(),
            "Query: asthma • Trials: 2 • Fetch: 1.23s • NER: 0.50s"
        );

        session.timing.ner_secs = None;
        assert_eq!(status_caption(&session).unwrap(), "Query: asthma • Trials: 2 • Fetch: 1.23s");
    }

    #[test]
    fn test_page_marks_active_tab_and_escapes_query() {
        let frame = Frame {
            query: "<script>".into(),
            max_results: 25,
            max_results_cap: 50,
            status: None,
            errors: vec![],
        };
        let html = page(&frame, "heatmaps", "<p>body</p>");
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains(r#"href="/heatmaps" class="tab active""#));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_table_escapes_cells() {
        let html = table(&["A"], vec![vec!["<x>".to_string()]]);
        assert!(html.contains("<td>&lt;x&gt;</td>"));
    }
}
