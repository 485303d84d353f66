//! Multi-page PDF report, one heatmap per page.
//!
//! Pages are drawn with path and text operators using the built-in Helvetica
//! font, so the output needs no embedded resources.

use crate::error::Result;
use crate::heatmap::{coolwarm, Heatmap, Rgb};
use crate::scope::ScopeReport;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
use std::path::{Path, PathBuf};
use tracing::info;

const PAGE_W: f32 = 576.0;
const PAGE_H: f32 = 432.0;
const GRID_X: f32 = 90.0;
const GRID_Y: f32 = 50.0;
const CELL_W: f32 = 76.0;
const CELL_H: f32 = 64.0;
const BAR_X: f32 = 490.0;
const BAR_W: f32 = 14.0;
const BAR_STEPS: usize = 40;
const FONT: Name<'static> = Name(b"F1");

/// `Acme Tools Inc` -> `Acme_Tools_Inc_full_report.pdf`. Anything outside
/// `[A-Za-z0-9._-]` becomes `_`, so the name never leaves the output dir.
pub fn report_file_name(supplier: &str) -> String {
    let stem: String = supplier
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();
    format!("{}_full_report.pdf", stem)
}

/// Helvetica here uses the standard single-byte encoding; other characters
/// are shown as `?`.
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .collect()
}

/// Helvetica averages a little over half an em per glyph.
fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.55
}

fn fill(content: &mut Content, c: Rgb) {
    content.set_fill_rgb(c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0);
}

fn text_at(content: &mut Content, x: f32, y: f32, size: f32, color: Rgb, text: &str) {
    fill(content, color);
    content.begin_text();
    content.set_font(FONT, size);
    content.next_line(x, y);
    content.show(Str(&pdf_text(text)));
    content.end_text();
}

fn text_centered(content: &mut Content, cx: f32, y: f32, size: f32, color: Rgb, text: &str) {
    text_at(content, cx - approx_width(text, size) / 2.0, y, size, color, text);
}

fn rect(content: &mut Content, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
    fill(content, color);
    content.rect(x, y, w, h);
    content.fill_nonzero();
}

fn line(content: &mut Content, from: (f32, f32), to: (f32, f32)) {
    content.move_to(from.0, from.1);
    content.line_to(to.0, to.1);
    content.stroke();
}

/// Content stream for one heatmap page.
fn page_content(heatmap: &Heatmap) -> Vec<u8> {
    let mut content = Content::new();
    let black = [0, 0, 0];
    let rows = heatmap.row_labels.len();
    let cols = heatmap.col_labels.len();
    let grid_top = GRID_Y + CELL_H * rows as f32;
    let grid_right = GRID_X + CELL_W * cols as f32;

    text_centered(&mut content, PAGE_W / 2.0, PAGE_H - 30.0, 13.0, black, &heatmap.title);

    for cell in &heatmap.cells {
        // Row 0 is drawn at the top.
        let x = GRID_X + CELL_W * cell.col as f32;
        let y = grid_top - CELL_H * (cell.row + 1) as f32;
        rect(&mut content, x, y, CELL_W, CELL_H, cell.fill);
        text_centered(&mut content, x + CELL_W / 2.0, y + CELL_H / 2.0 - 4.0, 11.0, cell.text_color, &cell.text);
    }

    // Thin white separators, as between heatmap cells on screen.
    content.set_stroke_rgb(1.0, 1.0, 1.0);
    content.set_line_width(0.5);
    for i in 0..=cols {
        let x = GRID_X + CELL_W * i as f32;
        line(&mut content, (x, GRID_Y), (x, grid_top));
    }
    for i in 0..=rows {
        let y = GRID_Y + CELL_H * i as f32;
        line(&mut content, (GRID_X, y), (grid_right, y));
    }

    for (i, label) in heatmap.row_labels.iter().enumerate() {
        let y = grid_top - CELL_H * (i as f32 + 0.5) - 3.0;
        text_at(&mut content, GRID_X - 8.0 - approx_width(label, 9.0), y, 9.0, black, label);
    }
    for (i, label) in heatmap.col_labels.iter().enumerate() {
        let cx = GRID_X + CELL_W * (i as f32 + 0.5);
        text_centered(&mut content, cx, GRID_Y - 16.0, 9.0, black, label);
    }
    text_centered(&mut content, GRID_X + CELL_W * 2.5, GRID_Y - 32.0, 10.0, black, "Customer Size");
    text_at(&mut content, 12.0, grid_top + 8.0, 10.0, black, "Customer Type");

    if heatmap.scale.is_some() {
        let bar_h = CELL_H * rows as f32;
        let step = bar_h / BAR_STEPS as f32;
        for i in 0..BAR_STEPS {
            let t = (i as f64 + 0.5) / BAR_STEPS as f64;
            rect(&mut content, BAR_X, GRID_Y + step * i as f32, BAR_W, step + 0.2, coolwarm(t));
        }
        for (pos, label) in heatmap.legend_ticks() {
            let y = GRID_Y + bar_h * pos as f32 - 3.0;
            text_at(&mut content, BAR_X + BAR_W + 4.0, y, 8.0, black, &label);
        }
    }

    content.finish()
}

#[derive(Debug, Default)]
pub struct PdfReport {
    pages: Vec<Vec<u8>>,
}

impl PdfReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_heatmap(&mut self, heatmap: &Heatmap) {
        self.pages.push(page_content(heatmap));
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let font_id = Ref::new(3);
        // A (page, content) pair per page after the shared objects.
        let page_id = |i: usize| Ref::new(4 + 2 * i as i32);
        let content_id = |i: usize| Ref::new(5 + 2 * i as i32);

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids((0..self.pages.len()).map(page_id))
            .count(self.pages.len() as i32);
        pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

        for (i, stream) in self.pages.iter().enumerate() {
            let mut page = pdf.page(page_id(i));
            page.media_box(Rect::new(0.0, 0.0, PAGE_W, PAGE_H));
            page.parent(tree_id);
            page.contents(content_id(i));
            page.resources().fonts().pair(FONT, font_id);
            page.finish();
            pdf.stream(content_id(i), stream);
        }

        pdf.finish()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Builds the PDF for a single-supplier report: three summary pages, then
/// three per discount group.
pub fn build_report_pdf(report: &ScopeReport) -> PdfReport {
    let mut pdf = PdfReport::new();
    for (title, matrix) in report.pages() {
        pdf.add_heatmap(&Heatmap::new(title, matrix));
    }
    pdf
}

/// Writes the supplier report into `dir`. Returns `None` when every supplier
/// is selected, since no report exists for that scope.
pub fn write_supplier_report(report: &ScopeReport, dir: &Path) -> Result<Option<PathBuf>> {
    if !report.scope.has_group_breakdown() {
        return Ok(None);
    }
    let pdf = build_report_pdf(report);
    let path = dir.join(report_file_name(report.scope.supplier.label()));
    pdf.write_to(&path)?;
    info!(path = %path.display(), pages = pdf.page_count(), "wrote supplier report");
    Ok(Some(path))
}
