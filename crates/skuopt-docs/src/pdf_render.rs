//! A4 product sheet for one stored generation.
//!
//! Coordinates are given in millimetres from the top-left corner and
//! converted to PDF points when emitted. Text uses the standard Helvetica
//! fonts with `WinAnsiEncoding`, so no font files are embedded.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use skuopt_core::listing::{section_value, SectionValue, DISPLAY_SECTIONS};
use skuopt_core::GenerationRecord;

use crate::error::DocsError;

const PT_PER_MM: f32 = 72.0 / 25.4;
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_X_MM: f32 = 10.0;
const TOP_MM: f32 = 20.0;
const SECTIONS_START_MM: f32 = 52.0;
/// A section heading is not started below this line.
const HEADING_LIMIT_MM: f32 = 270.0;
const BOTTOM_LIMIT_MM: f32 = 280.0;
const LINE_HEIGHT_MM: f32 = 5.0;
const HEADING_GAP_MM: f32 = 7.0;
const SECTION_GAP_MM: f32 = 8.0;
const FAQ_GAP_MM: f32 = 3.0;
/// Characters per line of 10 pt Helvetica across 180 mm.
const WRAP_CHARS: usize = 95;
/// The same width at the 18 pt title size.
const TITLE_WRAP_CHARS: usize = 52;
const TITLE_LINE_HEIGHT_MM: f32 = 8.0;

const BODY_GRAY: f32 = 0.0;
const MUTED_GRAY: f32 = 100.0 / 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Collects drawing operations page by page while tracking the cursor.
struct SheetWriter {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl SheetWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: TOP_MM,
        }
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.y = TOP_MM;
    }

    fn ensure_room(&mut self, needed_mm: f32, limit_mm: f32) {
        if self.y + needed_mm > limit_mm {
            self.new_page();
        }
    }

    fn text_at(&mut self, font: Font, size: f32, gray: f32, y_mm: f32, text: &str) {
        let x = MARGIN_X_MM * PT_PER_MM;
        let y = (PAGE_HEIGHT_MM - y_mm) * PT_PER_MM;
        self.current.extend([
            Operation::new("g", vec![gray.into()]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_name().into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Writes wrapped body lines at the cursor, breaking pages as needed.
    fn lines(&mut self, font: Font, lines: &[String]) {
        for line in lines {
            self.ensure_room(0.0, BOTTOM_LIMIT_MM);
            self.text_at(font, 10.0, BODY_GRAY, self.y, line);
            self.y += LINE_HEIGHT_MM;
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.new_page();
        self.pages
    }
}

/// Renders the product sheet for `record` as PDF bytes.
///
/// # Errors
///
/// Returns [`DocsError::Pdf`] if a content stream cannot be encoded, or
/// [`DocsError::Io`] if serialization fails.
pub fn render_listing_pdf(record: &GenerationRecord) -> Result<Vec<u8>, DocsError> {
    let content = record.normalized_content();
    let mut sheet = SheetWriter::new();

    let title = wrap_text(
        &format!("Ficha de Producto: {}", record.product_name),
        TITLE_WRAP_CHARS,
    );
    let mut title_y = TOP_MM;
    for line in &title {
        sheet.text_at(Font::Bold, 18.0, BODY_GRAY, title_y, line);
        title_y += TITLE_LINE_HEIGHT_MM;
    }
    // Header lines below the title move down with each extra title line.
    #[allow(clippy::cast_precision_loss)]
    let shift = title.len().saturating_sub(1) as f32 * TITLE_LINE_HEIGHT_MM;

    let category = non_empty(&record.settings.category).unwrap_or("General");
    let channel = record
        .settings
        .channel
        .as_deref()
        .and_then(non_empty)
        .unwrap_or("Ecommerce");
    sheet.text_at(
        Font::Regular,
        10.0,
        MUTED_GRAY,
        28.0 + shift,
        &format!("Categoría: {category} | Canal: {channel}"),
    );
    sheet.text_at(
        Font::Regular,
        10.0,
        MUTED_GRAY,
        34.0 + shift,
        &format!("Fecha: {}", record.created_at.format("%d/%m/%Y")),
    );
    if let Some(score) = record.displayed_score() {
        sheet.text_at(
            Font::Bold,
            10.0,
            MUTED_GRAY,
            42.0 + shift,
            &format!("Score de Optimización: {}/100", format_score(score)),
        );
    }

    sheet.y = SECTIONS_START_MM + shift;
    for section in DISPLAY_SECTIONS.iter().filter(|s| s.key != "score") {
        let Some(value) = section_value(&content, section.key) else {
            continue;
        };

        sheet.ensure_room(0.0, HEADING_LIMIT_MM);
        sheet.text_at(
            Font::Bold,
            12.0,
            BODY_GRAY,
            sheet.y,
            &section.label.to_uppercase(),
        );
        sheet.y += HEADING_GAP_MM;

        match value {
            SectionValue::Faq(entries) => {
                for entry in entries {
                    let question = wrap_text(&format!("P: {}", entry.q), WRAP_CHARS);
                    let answer = wrap_text(&format!("R: {}", entry.a), WRAP_CHARS);
                    #[allow(clippy::cast_precision_loss)]
                    let needed = (question.len() + answer.len()) as f32 * LINE_HEIGHT_MM;
                    sheet.ensure_room(needed, BOTTOM_LIMIT_MM);
                    sheet.lines(Font::Bold, &question);
                    sheet.lines(Font::Regular, &answer);
                    sheet.y += FAQ_GAP_MM;
                }
            }
            SectionValue::List(items) => {
                let bulleted = items
                    .iter()
                    .map(|item| format!("• {item}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                sheet.lines(Font::Regular, &wrap_text(&bulleted, WRAP_CHARS));
            }
            SectionValue::Text(text) => {
                sheet.lines(Font::Regular, &wrap_text(&text, WRAP_CHARS));
            }
            SectionValue::Object(value) => {
                sheet.lines(Font::Regular, &wrap_text(&value.to_string(), WRAP_CHARS));
            }
        }

        sheet.y += SECTION_GAP_MM;
    }

    build_document(sheet.finish())
}

/// `Botella  Térmica` becomes `Botella_Térmica_ficha.pdf`.
#[must_use]
pub fn listing_pdf_filename(product_name: &str) -> String {
    let mut name = String::with_capacity(product_name.len() + 10);
    let mut in_whitespace = false;
    for c in product_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                name.push('_');
            }
            in_whitespace = true;
        } else {
            name.push(c);
            in_whitespace = false;
        }
    }
    name.push_str("_ficha.pdf");
    name
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, DocsError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular_id,
            Font::Bold.resource_name() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let stream = Stream::new(dictionary! {}, Content { operations }.encode()?);
        let content_id = doc.add_object(stream);
        let page_id = add_page(&mut doc, pages_id, content_id, resources_id);
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    content_id: ObjectId,
    resources_id: ObjectId,
) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (PAGE_WIDTH_MM * PT_PER_MM).into(),
            (PAGE_HEIGHT_MM * PT_PER_MM).into(),
        ],
    })
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Whole scores print without a decimal point.
pub(crate) fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        score.to_string()
    }
}

/// Greedy word wrap on `max_chars`, honouring embedded newlines. Words
/// longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(word.iter());
            line_len += word.len();
        }
        lines.push(line);
    }
    lines
}

/// Encodes text for a `WinAnsiEncoding` font. Characters outside the code
/// page become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            c if c.is_ascii() || ('\u{a0}'..='\u{ff}').contains(&c) => {
                u8::try_from(u32::from(c)).unwrap_or(b'?')
            }
            _ => b'?',
        })
        .collect()
}
