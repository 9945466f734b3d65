use crate::detection::Formality;
use crate::history::{Exchange, History};
use crate::languages::Language;

/// Human-readable reply for one exchange.
pub fn render_exchange(exchange: &Exchange) -> String {
    let detection = &exchange.detection;
    let translation = &exchange.translation;

    let detected = match Language::lookup(&detection.language) {
        Some(language) => format!("{} {}", language.flag(), detection.language),
        None => detection.language.clone(),
    };
    let mut lines = vec![
        format!(
            "Detected language: {} (confidence: {})",
            detected,
            percent(detection.confidence)
        ),
        format!("Translation: \"{}\"", translation.primary_translation),
    ];

    if detection.formality != Formality::Neutral {
        lines.push(format!("Tone: {}", detection.formality));
    }
    if !translation.alternatives.is_empty() {
        let quoted = translation
            .alternatives
            .iter()
            .map(|alternative| format!("\"{}\"", alternative))
            .collect::<Vec<_>>();
        lines.push(format!("Alternatives: {}", quoted.join(", ")));
    }
    if let Some(literal) = &translation.literal_translation
        && literal != &translation.primary_translation
    {
        lines.push(format!("Literal: {}", literal));
    }
    if let Some(note) = &translation.cultural_note {
        lines.push(format!("Cultural context: {}", note));
    }

    lines.join("\n")
}

/// The most recent `limit` exchanges, newest first.
pub fn render_history(history: &History, limit: usize) -> String {
    if history.is_empty() {
        return "No translations yet.".to_string();
    }
    history
        .recent(limit)
        .map(|exchange| {
            format!(
                "{} → {}\n  original: {}\n  translation: {}",
                exchange.detection.language,
                exchange.translation.target_language,
                exchange.input_text,
                exchange.translation.primary_translation
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}
