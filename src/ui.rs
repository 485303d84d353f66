use crate::cache::{MatrixCache, MemoCache, SourceId};
use crate::config::{Settings, SETTINGS_FILE};
use crate::fetch::{FetchRequest, SalesApiClient, DATE_FORMAT};
use crate::heatmap::{Heatmap, Rgb};
use crate::loader::{fingerprint_file, load_dataset_bytes, Dataset, FileFormat};
use crate::matrix::MarginMatrix;
use crate::model::{CustomerSize, CustomerType};
use crate::pdf::write_supplier_report;
use crate::scope::{
    build_report, supplier_choices, MatrixKind, MatrixSet, ReportOutcome, ReportScope,
    ScopeReport, SupplierFilter, ALL_SUPPLIERS,
};
use chrono::{Days, Local};
use eframe::egui;
use egui::{
    Align2, Color32, Context, CornerRadius, FontFamily, FontId, Margin, RichText, Sense, Stroke,
    StrokeKind, Vec2, Visuals,
};
use egui_extras::{Column, TableBuilder};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{info, warn};

const HEATMAP_SIZE: Vec2 = Vec2::new(620.0, 400.0);

pub fn set_custom_style(ctx: &Context) {
    let mut visuals = Visuals::light();

    visuals.panel_fill = Color32::from_rgb(246, 246, 243);
    visuals.window_fill = Color32::from_rgb(252, 252, 250);
    visuals.faint_bg_color = Color32::from_rgb(236, 236, 232);

    visuals.widgets.hovered.bg_stroke = Stroke::new(1.5, Color32::from_rgb(59, 76, 192));
    visuals.widgets.active.bg_stroke = Stroke::new(2.0, Color32::from_rgb(180, 4, 38));

    visuals.selection.bg_fill = Color32::from_rgb(190, 205, 245);
    visuals.selection.stroke = Stroke::new(1.0, Color32::from_rgb(59, 76, 192));

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);

    style.text_styles.insert(
        egui::TextStyle::Body,
        FontId::new(14.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Heading,
        FontId::new(20.0, FontFamily::Proportional),
    );

    ctx.set_style(style);
}

fn color(c: Rgb) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Info(String),
    Warning(String),
    Error(String),
}

/// Heatmaps for one matrix set, in `MatrixKind::ALL` order.
struct SetView {
    heading: Option<String>,
    maps: Vec<Heatmap>,
}

impl SetView {
    fn new(set: &MatrixSet, supplier: &SupplierFilter) -> Self {
        Self {
            heading: set.group.as_ref().map(|g| format!("Group {}", g)),
            maps: MatrixKind::ALL
                .into_iter()
                .map(|kind| Heatmap::new(set.title(kind, supplier), set.matrix(kind)))
                .collect(),
        }
    }
}

pub struct MarginApp {
    settings: Settings,

    // Inputs
    file_path: String,
    supplier_id: String,
    start_date: String,
    end_date: String,

    // Loaded data
    dataset: Option<Rc<Dataset>>,
    datasets: MemoCache<SourceId, Rc<Dataset>>,
    matrices: MatrixCache,
    suppliers: Vec<String>,

    // Scope
    selected_supplier: SupplierFilter,
    exclude_misc: bool,

    // Results
    report: Option<ScopeReport>,
    views: Vec<SetView>,
    show_tables: bool,
    status: Option<Status>,
}

impl MarginApp {
    pub fn new(settings: Settings) -> Self {
        let today = Local::now().date_naive();
        let start = today.checked_sub_days(Days::new(30)).unwrap_or(today);
        Self {
            file_path: settings
                .last_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            supplier_id: String::new(),
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: today.format(DATE_FORMAT).to_string(),

            dataset: None,
            datasets: MemoCache::new(),
            matrices: MatrixCache::new(),
            suppliers: Vec::new(),

            selected_supplier: SupplierFilter::All,
            exclude_misc: settings.exclude_misc_default,

            report: None,
            views: Vec::new(),
            show_tables: false,
            status: None,
            settings,
        }
    }

    fn clear_results(&mut self) {
        self.dataset = None;
        self.report = None;
        self.views.clear();
        self.suppliers.clear();
        self.selected_supplier = SupplierFilter::All;
    }

    fn set_dataset(&mut self, dataset: Rc<Dataset>) {
        self.suppliers = supplier_choices(&dataset.records);
        if let SupplierFilter::Supplier(name) = &self.selected_supplier {
            if !self.suppliers.contains(name) {
                self.selected_supplier = SupplierFilter::All;
            }
        }
        self.dataset = Some(dataset);
        self.status = None;
        self.recompute();
    }

    fn load_file(&mut self) {
        let path = PathBuf::from(self.file_path.trim());
        match self.read_dataset(&path) {
            Ok(dataset) => {
                self.settings.last_file = Some(path);
                if let Err(e) = self.settings.save(Path::new(SETTINGS_FILE)) {
                    warn!(error = %e, "could not save settings");
                }
                self.set_dataset(dataset);
            }
            Err(e) => {
                self.clear_results();
                self.status = Some(Status::Error(format!("Could not load file: {}", e)));
            }
        }
    }

    fn read_dataset(&mut self, path: &Path) -> crate::error::Result<Rc<Dataset>> {
        let format = FileFormat::from_path(path)?;
        let (id, bytes) = fingerprint_file(path)?;
        if let Some(ds) = self.datasets.get(&id) {
            info!(source = %id, "file unchanged, reusing parsed records");
            return Ok(ds.clone());
        }
        let ds = Rc::new(load_dataset_bytes(&bytes, format, &path.display().to_string())?);
        self.datasets.insert(id, ds.clone());
        Ok(ds)
    }

    fn fetch_live(&mut self) {
        match self.fetch_dataset() {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                self.clear_results();
                self.status = Some(Status::Error(format!("Fetch failed: {}", e)));
            }
        }
    }

    fn fetch_dataset(&mut self) -> crate::error::Result<Rc<Dataset>> {
        let req = FetchRequest::new(&self.supplier_id, &self.start_date, &self.end_date)?;
        self.settings.validate()?;
        let client = SalesApiClient::new(&self.settings.fetch_endpoint, self.settings.fetch_timeout())?;
        let id = req.source_id(client.endpoint());
        if let Some(ds) = self.datasets.get(&id) {
            return Ok(ds.clone());
        }
        let ds = Rc::new(client.fetch(&req)?);
        self.datasets.insert(id, ds.clone());
        Ok(ds)
    }

    fn recompute(&mut self) {
        self.report = None;
        self.views.clear();

        let Some(dataset) = self.dataset.clone() else {
            return;
        };

        let scope = ReportScope::new(self.selected_supplier.clone(), self.exclude_misc);
        match build_report(&dataset.source, &dataset.records, &scope, &mut self.matrices) {
            ReportOutcome::Empty => {
                self.status = Some(Status::Warning("No data available after filtering.".into()));
            }
            ReportOutcome::Ready(report) => {
                self.views = std::iter::once(&report.summary)
                    .chain(report.groups.iter())
                    .map(|set| SetView::new(set, &report.scope.supplier))
                    .collect();
                self.status = if report.scope.has_group_breakdown() {
                    None
                } else {
                    Some(Status::Info(
                        "PDF generation and group-level views are only available when a specific supplier is selected.".into(),
                    ))
                };
                self.report = Some(report);
            }
        }
    }

    fn generate_pdf(&mut self) {
        let Some(report) = &self.report else {
            return;
        };
        self.status = Some(match write_supplier_report(report, &self.settings.output_dir) {
            Ok(Some(path)) => Status::Info(format!("Report saved to {}", path.display())),
            Ok(None) => Status::Info("Select a single supplier to generate a PDF.".into()),
            Err(e) => Status::Error(format!("Could not write report: {}", e)),
        });
    }

    fn status_label(&self, ui: &mut egui::Ui) {
        match &self.status {
            Some(Status::Info(msg)) => {
                ui.label(RichText::new(format!("ℹ {}", msg)).color(Color32::from_rgb(40, 70, 160)));
            }
            Some(Status::Warning(msg)) => {
                ui.label(RichText::new(format!("⚠ {}", msg)).color(Color32::from_rgb(170, 110, 0)));
            }
            Some(Status::Error(msg)) => {
                ui.label(RichText::new(format!("✖ {}", msg)).color(Color32::from_rgb(180, 4, 38)).strong());
            }
            None => {}
        }
    }
}

fn paint_heatmap(ui: &mut egui::Ui, heatmap: &Heatmap) {
    let (rect, _response) = ui.allocate_exact_size(HEATMAP_SIZE, Sense::hover());
    let painter = ui.painter_at(rect);
    let text_color = Color32::from_rgb(30, 30, 30);

    painter.rect_filled(rect, CornerRadius::ZERO, Color32::WHITE);
    painter.text(
        rect.center_top() + egui::vec2(0.0, 14.0),
        Align2::CENTER_CENTER,
        &heatmap.title,
        FontId::proportional(15.0),
        text_color,
    );

    let rows = heatmap.row_labels.len() as f32;
    let cols = heatmap.col_labels.len() as f32;
    let grid = egui::Rect::from_min_max(
        rect.min + egui::vec2(80.0, 34.0),
        rect.max - egui::vec2(70.0, 36.0),
    );
    let cell = egui::vec2(grid.width() / cols, grid.height() / rows);

    for c in &heatmap.cells {
        let min = grid.min + egui::vec2(cell.x * c.col as f32, cell.y * c.row as f32);
        let r = egui::Rect::from_min_size(min, cell);
        painter.rect_filled(r, CornerRadius::ZERO, color(c.fill));
        painter.rect_stroke(r, CornerRadius::ZERO, Stroke::new(0.5, Color32::WHITE), StrokeKind::Inside);
        painter.text(r.center(), Align2::CENTER_CENTER, &c.text, FontId::proportional(13.0), color(c.text_color));
    }

    for (i, label) in heatmap.row_labels.iter().enumerate() {
        let pos = egui::pos2(grid.min.x - 6.0, grid.min.y + cell.y * (i as f32 + 0.5));
        painter.text(pos, Align2::RIGHT_CENTER, *label, FontId::proportional(12.0), text_color);
    }
    for (i, label) in heatmap.col_labels.iter().enumerate() {
        let pos = egui::pos2(grid.min.x + cell.x * (i as f32 + 0.5), grid.max.y + 10.0);
        painter.text(pos, Align2::CENTER_CENTER, *label, FontId::proportional(12.0), text_color);
    }
    painter.text(
        egui::pos2(grid.center().x, grid.max.y + 26.0),
        Align2::CENTER_CENTER,
        "Customer Size",
        FontId::proportional(12.0),
        text_color,
    );
    painter.text(
        egui::pos2(rect.min.x + 6.0, grid.min.y - 10.0),
        Align2::LEFT_CENTER,
        "Customer Type",
        FontId::proportional(12.0),
        text_color,
    );

    if heatmap.scale.is_some() {
        let bar = egui::Rect::from_min_max(
            egui::pos2(grid.max.x + 14.0, grid.min.y),
            egui::pos2(grid.max.x + 28.0, grid.max.y),
        );
        let steps = 40;
        let step_h = bar.height() / steps as f32;
        for i in 0..steps {
            // Top of the bar is the high end of the scale.
            let t = 1.0 - (i as f64 + 0.5) / steps as f64;
            let r = egui::Rect::from_min_size(
                egui::pos2(bar.min.x, bar.min.y + step_h * i as f32),
                egui::vec2(bar.width(), step_h + 0.5),
            );
            painter.rect_filled(r, CornerRadius::ZERO, color(crate::heatmap::coolwarm(t)));
        }
        for (pos, label) in heatmap.legend_ticks() {
            let y = bar.max.y - bar.height() * pos as f32;
            painter.text(
                egui::pos2(bar.max.x + 4.0, y),
                Align2::LEFT_CENTER,
                label,
                FontId::proportional(10.0),
                text_color,
            );
        }
    }
}

fn matrix_table(ui: &mut egui::Ui, id: &str, matrix: &MarginMatrix, counts: Option<&[[usize; 5]; 5]>) {
    ui.push_id(id, |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(90.0))
            .columns(Column::exact(100.0), CustomerSize::ALL.len())
            .header(22.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Type \\ Size");
                });
                for size in CustomerSize::ALL {
                    header.col(|ui| {
                        ui.strong(size.code());
                    });
                }
            })
            .body(|mut body| {
                for ctype in CustomerType::ALL {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.strong(ctype.code());
                        });
                        for csize in CustomerSize::ALL {
                            row.col(|ui| {
                                let text = match (matrix.get(ctype, csize), counts) {
                                    (Some(v), Some(n)) => {
                                        format!("{:.2} (n={})", v, n[ctype.index()][csize.index()])
                                    }
                                    (Some(v), None) => format!("{:.2}", v),
                                    (None, _) => "–".to_string(),
                                };
                                ui.label(text);
                            });
                        }
                    });
                }
            });
    });
}

impl eframe::App for MarginApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading(RichText::new("📊 Supplier and Discount Group Margin Analyzer").strong());
            ui.add_space(4.0);
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("File:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.file_path)
                        .hint_text("orders.xlsx, .csv or .json")
                        .desired_width(320.0),
                );
                if ui.button("📂 Load").clicked() {
                    self.load_file();
                }

                ui.separator();

                ui.label("Supplier id:");
                ui.add(egui::TextEdit::singleline(&mut self.supplier_id).desired_width(80.0));
                ui.label("From:");
                ui.add(egui::TextEdit::singleline(&mut self.start_date).desired_width(90.0));
                ui.label("To:");
                ui.add(egui::TextEdit::singleline(&mut self.end_date).desired_width(90.0));
                if ui.button("🌐 Fetch").clicked() {
                    self.fetch_live();
                }
            });

            ui.add_space(2.0);
            self.status_label(ui);
            ui.add_space(2.0);
        });

        if self.dataset.is_some() {
            egui::SidePanel::left("scope")
                .min_width(230.0)
                .max_width(320.0)
                .show(ctx, |ui| {
                    ui.heading("Scope");
                    ui.separator();

                    let mut changed = false;

                    ui.label(RichText::new("Supplier").strong());
                    egui::ComboBox::from_id_salt("supplier")
                        .selected_text(self.selected_supplier.label().to_string())
                        .width(210.0)
                        .show_ui(ui, |ui| {
                            if ui
                                .selectable_value(&mut self.selected_supplier, SupplierFilter::All, ALL_SUPPLIERS)
                                .changed()
                            {
                                changed = true;
                            }
                            for name in &self.suppliers {
                                let choice = SupplierFilter::Supplier(name.clone());
                                if ui
                                    .selectable_value(&mut self.selected_supplier, choice, name.as_str())
                                    .changed()
                                {
                                    changed = true;
                                }
                            }
                        });

                    ui.add_space(8.0);
                    if ui
                        .checkbox(
                            &mut self.exclude_misc,
                            "Exclude Sales Discount Groups starting or ending with 'Z' (Miscellaneous)",
                        )
                        .changed()
                    {
                        changed = true;
                    }

                    ui.add_space(8.0);
                    ui.checkbox(&mut self.show_tables, "Show matrices as tables");

                    if changed {
                        self.recompute();
                    }

                    ui.add_space(10.0);
                    ui.separator();

                    if let Some(ds) = &self.dataset {
                        ui.label(RichText::new("Data").strong());
                        ui.label(format!("Source: {}", ds.label));
                        ui.label(format!("Id: {}", ds.source));
                        ui.label(format!("Records: {}", ds.records.len()));
                        if ds.rejected_total() > 0 {
                            ui.label(format!("Skipped rows: {}", ds.rejected_total()));
                            for (reason, count) in &ds.rejected {
                                ui.label(RichText::new(format!("  {}: {}", reason, count)).small());
                            }
                        }
                    }
                    if let Some(report) = &self.report {
                        ui.label(format!("In scope: {}", report.record_count));
                    }
                    ui.label(
                        RichText::new(format!(
                            "Cached matrices: {} ({} hits)",
                            self.matrices.len(),
                            self.matrices.hits()
                        ))
                        .small(),
                    );
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(report) = &self.report else {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new("Load a sales-order file or fetch live data to begin")
                            .size(18.0)
                            .color(Color32::from_rgb(120, 120, 120)),
                    );
                });
                return;
            };

            let mut want_pdf = false;

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading(format!("📊 {}", report.heading()));
                ui.add_space(6.0);

                let sets = std::iter::once(&report.summary).chain(report.groups.iter());
                for (i, (set, view)) in sets.zip(self.views.iter()).enumerate() {
                    if i == 1 {
                        ui.add_space(12.0);
                        ui.separator();
                        ui.heading("📊 Sales Discount Group Heatmaps");
                    }
                    if let Some(heading) = &view.heading {
                        ui.add_space(8.0);
                        ui.label(RichText::new(heading).strong().size(16.0));
                    }
                    for (kind, map) in MatrixKind::ALL.into_iter().zip(view.maps.iter()) {
                        if self.show_tables {
                            ui.label(RichText::new(&map.title).strong());
                            let counts = (kind == MatrixKind::Actual).then_some(&set.counts);
                            matrix_table(ui, &format!("{}-{}", i, map.title), set.matrix(kind), counts);
                            ui.add_space(6.0);
                        } else {
                            paint_heatmap(ui, map);
                            ui.add_space(6.0);
                        }
                    }
                }

                if report.scope.has_group_breakdown() {
                    ui.add_space(12.0);
                    ui.separator();
                    ui.heading("📄 Export PDF Report for Supplier");
                    if ui.button("Generate PDF").clicked() {
                        want_pdf = true;
                    }
                }
            });

            if want_pdf {
                self.generate_pdf();
            }
        });
    }
}
