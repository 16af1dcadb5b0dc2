//! Run one recognizer over a piece of text and print the spans.
//!
//!   cargo run -p trialnlp-ner --example annotate_text -- "Metformin for type 2 diabetes"
//!   cargo run -p trialnlp-ner --example annotate_text -- --model alvaroalon2/biobert_diseases_ner "..."

use std::time::Instant;

use trialnlp_ner::{map_label_group, normalize_entity_text, EntityRecognizer, NerConfig, NerModel, TrieNer};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let model_id = match args.iter().position(|a| a == "--model") {
        Some(i) if i + 1 < args.len() => {
            let id = args.remove(i + 1);
            args.remove(i);
            Some(id)
        }
        _ => None,
    };
    let text = if args.is_empty() {
        "Adults with type 2 diabetes receiving metformin or semaglutide; HbA1c and GLP-1 levels measured.".to_string()
    } else {
        args.join(" ")
    };

    let start = Instant::now();
    let recognizer: Box<dyn EntityRecognizer> = match model_id {
        Some(model_id) => Box::new(NerModel::load(NerConfig { model_id, ..Default::default() })?),
        None => Box::new(TrieNer::with_categories(&[])?),
    };
    println!("Loaded {} in {:?}", recognizer.name(), start.elapsed());

    let start = Instant::now();
    let entities = recognizer.recognize(&text)?;
    println!("Extraction took {:?}\n", start.elapsed());

    for e in &entities {
        println!(
            "  [{:>4}..{:<4}] {:<14} {:<24} norm={:?} score={}",
            e.start,
            e.end,
            map_label_group(&e.label).as_str(),
            e.text,
            normalize_entity_text(&e.text),
            e.score.map(|s| format!("{s:.2}")).unwrap_or_else(|| "-".into()),
        );
    }
    println!("\n{} entities", entities.len());
    Ok(())
}
