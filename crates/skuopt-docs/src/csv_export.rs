use chrono::SecondsFormat;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value;
use skuopt_core::listing::{section_value, SectionValue, DISPLAY_SECTIONS};
use skuopt_core::GenerationRecord;

use crate::error::DocsError;
use crate::pdf_render::format_score;

/// Download name for the history export.
pub const HISTORY_CSV_FILENAME: &str = "historial_fichas_profesional.csv";

const FIXED_HEADERS: [&str; 7] = [
    "ID",
    "Producto",
    "Categoría",
    "Canal",
    "Tono",
    "Score IA",
    "Fecha",
];

/// Renders the full history as CSV: fixed columns followed by one column per
/// display section. Every cell is quoted.
///
/// # Errors
///
/// Returns [`DocsError::Csv`] if a record cannot be written.
pub fn history_csv(records: &[GenerationRecord]) -> Result<Vec<u8>, DocsError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let headers = FIXED_HEADERS
        .iter()
        .copied()
        .chain(DISPLAY_SECTIONS.iter().map(|s| s.label));
    writer.write_record(headers)?;

    for record in records {
        let content = record.normalized_content();
        let mut row = vec![
            record.id.to_string(),
            record.product_name.clone(),
            record.settings.category.clone(),
            record.settings.channel.clone().unwrap_or_default(),
            record.settings.tone.clone().unwrap_or_default(),
            record.displayed_score().map(format_score).unwrap_or_default(),
            record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ];
        row.extend(
            DISPLAY_SECTIONS
                .iter()
                .map(|section| section_cell(&content, section.key)),
        );
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| DocsError::Io(e.into_error()))
}

fn section_cell(content: &Value, key: &str) -> String {
    match section_value(content, key) {
        None => String::new(),
        Some(SectionValue::Text(text)) => text,
        Some(SectionValue::List(items)) => items.join(" | "),
        Some(SectionValue::Faq(entries)) => entries
            .iter()
            .map(|f| format!("{}: {}", f.q, f.a))
            .collect::<Vec<_>>()
            .join(" | "),
        Some(SectionValue::Object(value)) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use skuopt_core::GenerationSettings;

    use super::*;

    fn record(id: i64, score_ia: Option<i16>, content: Value) -> GenerationRecord {
        GenerationRecord {
            id,
            product_name: "Botella \"Hydra\"".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
            settings: GenerationSettings {
                category: "Hogar".to_string(),
                channel: Some("ecommerce".to_string()),
                tone: None,
            },
            content,
            score_ia,
        }
    }

    fn render(records: &[GenerationRecord]) -> String {
        String::from_utf8(history_csv(records).unwrap()).unwrap()
    }

    #[test]
    fn header_lists_fixed_and_section_columns() {
        let csv = render(&[]);
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with(
            "\"ID\",\"Producto\",\"Categoría\",\"Canal\",\"Tono\",\"Score IA\",\"Fecha\",\"Título SEO\""
        ));
        assert!(header.ends_with("\"Recomendación de IA\",\"Score\""));
    }

    #[test]
    fn rows_quote_and_flatten_values() {
        let csv = render(&[record(
            7,
            None,
            json!({
                "seo_title": "Legacy title",
                "bullets": ["a", "b"],
                "faq": [{"question": "¿Q?", "answer": "R"}],
                "score_ia": 81
            }),
        )]);
        let row = csv.lines().nth(1).unwrap();

        assert!(row.starts_with(
            "\"7\",\"Botella \"\"Hydra\"\"\",\"Hogar\",\"ecommerce\",\"\",\"81\",\"2026-03-14T10:00:00.000Z\",\"Legacy title\""
        ));
        assert!(row.contains("\"a | b\""));
        assert!(row.contains("\"¿Q?: R\""));
    }

    #[test]
    fn one_line_per_record() {
        let csv = render(&[record(1, Some(90), json!({})), record(2, None, json!({}))]);
        assert_eq!(csv.lines().count(), 3);
    }
}
