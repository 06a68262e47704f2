//! Fixed-layout PDF summary of a screening result.

use crate::domain::model::PredictionResponse;
use crate::utils::error::{AppError, Result};
use chrono::{DateTime, Local};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 25.4;
const LABEL_WIDTH: f32 = 50.8;
const VALUE_WIDTH: f32 = 101.6;
const ROW_HEIGHT: f32 = 8.0;
const LINE_HEIGHT: f32 = 5.0;
const BODY_SIZE: f32 = 10.0;
const WRAP_CHARS: usize = 62;

pub const REPORT_TITLE: &str = "Malnutrition Detection Report";
pub const DISCLAIMER: &str = "Disclaimer: This report is for informational purposes only. \
Always consult a healthcare professional for accurate diagnosis.";

/// Operator-entered details printed in the info table.
#[derive(Debug, Clone)]
pub struct ReportDetails {
    pub child_name: String,
    pub age_years: Option<u32>,
    pub gender: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub generated_at: DateTime<Local>,
}

impl ReportDetails {
    pub fn info_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Report Date:", self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            ("Child Name:", self.child_name.clone()),
            ("Age:", with_unit(self.age_years, "years")),
            ("Gender:", self.gender.clone()),
            ("Height:", with_unit(self.height_cm, "cm")),
            ("Weight:", with_unit(self.weight_kg, "kg")),
        ]
    }
}

fn with_unit<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
    value
        .map(|v| format!("{} {}", v, unit))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn result_rows(response: &PredictionResponse) -> Vec<(&'static str, String)> {
    let image = response
        .image_prediction()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let numeric = response
        .numeric_prediction()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let advice = response
        .advice()
        .or(response.error())
        .unwrap_or("No advice provided.")
        .to_string();

    vec![
        ("Image Prediction:", image),
        ("Numeric Prediction:", numeric),
        ("Advice:", advice),
    ]
}

pub fn default_report_filename(at: &DateTime<Local>) -> String {
    format!("malnutrition_report_{}.pdf", at.format("%Y%m%d_%H%M%S"))
}

/// Builtin PDF fonts only cover WinAnsi; anything else is dropped.
fn printable(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::ReportError {
        message: e.to_string(),
    }
}

struct Canvas {
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor: f32,
}

impl Canvas {
    fn segment(&self, from: (f32, f32), to: (f32, f32)) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0), Mm(from.1)), false),
                (Point::new(Mm(to.0), Mm(to.1)), false),
            ],
            is_closed: false,
        });
    }

    fn heading(&mut self, text: &str, size: f32, color: Rgb, centered: bool) {
        // Helvetica 平均字寬約 0.5em
        let approx_width = text.len() as f32 * size * 0.5 * 0.3528;
        let x = if centered {
            ((PAGE_WIDTH - approx_width) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };
        self.layer.set_fill_color(Color::Rgb(color));
        self.layer.use_text(printable(text), size, Mm(x), Mm(self.cursor), &self.bold);
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        self.cursor -= size * 0.3528 + 6.0;
    }

    fn table(&mut self, rows: &[(&str, String)]) {
        let left = MARGIN;
        let middle = MARGIN + LABEL_WIDTH;
        let right = MARGIN + LABEL_WIDTH + VALUE_WIDTH;

        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
        self.layer.set_outline_thickness(0.75);

        let mut top = self.cursor;
        self.segment((left, top), (right, top));

        for (label, value) in rows {
            let lines = wrap(&printable(value), WRAP_CHARS);
            let height = ROW_HEIGHT.max(lines.len() as f32 * LINE_HEIGHT + 3.0);
            let bottom = top - height;
            let baseline = top - 5.5;

            self.layer
                .use_text(printable(label), BODY_SIZE, Mm(left + 2.0), Mm(baseline), &self.bold);
            for (i, line) in lines.iter().enumerate() {
                let y = baseline - i as f32 * LINE_HEIGHT;
                self.layer
                    .use_text(line.as_str(), BODY_SIZE, Mm(middle + 2.0), Mm(y), &self.regular);
            }

            self.segment((left, bottom), (right, bottom));
            self.segment((left, top), (left, bottom));
            self.segment((middle, top), (middle, bottom));
            self.segment((right, top), (right, bottom));
            top = bottom;
        }

        self.cursor = top - 8.0;
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(&printable(text), 90) {
            self.layer
                .use_text(line, BODY_SIZE, Mm(MARGIN), Mm(self.cursor), &self.regular);
            self.cursor -= LINE_HEIGHT;
        }
    }
}

/// Renders the report and returns the PDF bytes.
pub fn render_report(details: &ReportDetails, response: &PredictionResponse) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        REPORT_TITLE,
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Report",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut canvas = Canvas {
        layer: doc.get_page(page).get_layer(layer),
        regular,
        bold,
        cursor: PAGE_HEIGHT - MARGIN,
    };

    canvas.heading(REPORT_TITLE, 20.0, Rgb::new(0.0, 0.4, 0.8, None), true);
    canvas.table(&details.info_rows());
    canvas.heading("Prediction Results", 14.0, Rgb::new(0.0, 0.0, 0.0, None), false);
    canvas.table(&result_rows(response));
    canvas.paragraph(DISCLAIMER);

    doc.save_to_bytes().map_err(pdf_error)
}
