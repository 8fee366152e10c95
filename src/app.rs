//! Application shell
//!
//! Thin egui front end over the core subsystems: folder selection, the region
//! editor window, batch scanning on a worker thread, and price enrichment.
//! All interaction logic lives in the editor state machine and the engines;
//! this module wires widgets to events and displays progress.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use eframe::egui;
use parking_lot::Mutex;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::editor::{canvas, EditorEvent, MatchPolicy, RegionEditor};
use crate::extract::{resolve_reference_lists, ExtractionEngine};
use crate::matcher::ReferenceLibrary;
use crate::pricing::enrich::{spawn_enrich, EnrichOptions, EnrichProgress};
use crate::pricing::{ebay::EbayProvider, PricePolicy};
use crate::report;
use crate::session::{LogMirror, SessionLog};
use crate::vision::tesseract::TesseractRecognizer;

/// Outcome of a background scan run.
enum ScanOutcome {
    Done { records: usize, report: Option<PathBuf> },
    Failed(String),
}

/// Region editor session over one batch of images.
struct EditorSession {
    editor: RegionEditor,
    images: Vec<PathBuf>,
    textures: HashMap<usize, egui::TextureHandle>,
    zone_name_input: String,
}

pub struct CardScanApp {
    config: AppConfig,
    input_dir: String,
    output_dir: String,
    csv_path: String,
    key_column: String,
    policy: PricePolicy,

    session: Option<EditorSession>,
    log_mirror: LogMirror,
    status: Option<String>,

    scan_rx: Option<Receiver<ScanOutcome>>,
    enrich_rx: Option<Receiver<EnrichProgress>>,
    enrich_cancel: Arc<AtomicBool>,
}

impl CardScanApp {
    pub fn new(config: AppConfig) -> Self {
        let input_dir = config
            .scan
            .input_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let output_dir = config
            .scan
            .output_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let policy = config.pricing.policy;

        Self {
            config,
            input_dir,
            output_dir,
            csv_path: String::new(),
            key_column: "Card Name".to_string(),
            policy,
            session: None,
            log_mirror: Arc::new(Mutex::new(Vec::new())),
            status: None,
            scan_rx: None,
            enrich_rx: None,
            enrich_cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([960.0, 720.0])
                .with_min_inner_size([700.0, 500.0])
                .with_title("Card Scanner"),
            ..Default::default()
        }
    }

    fn begin_region_selection(&mut self) {
        let input = PathBuf::from(self.input_dir.trim());
        if !input.is_dir() {
            self.status = Some(format!("Input folder does not exist: {}", input.display()));
            return;
        }
        if self.output_dir.trim().is_empty() {
            self.status = Some("Please choose an output folder.".to_string());
            return;
        }

        match list_images(&input) {
            Ok(images) if images.is_empty() => {
                self.status = Some("No images found in the input folder.".to_string());
            }
            Ok(images) => {
                let mut editor = RegionEditor::new(images.len());
                editor.handle_event(EditorEvent::AddZone { name: "Card Name".to_string() });
                self.session = Some(EditorSession {
                    editor,
                    images,
                    textures: HashMap::new(),
                    zone_name_input: String::new(),
                });
                self.status = None;
            }
            Err(e) => self.status = Some(format!("Failed to list images: {e}")),
        }
    }

    fn start_scan(&mut self, session: EditorSession) {
        let zones = session.editor.finish();
        if zones.is_empty() {
            self.status = Some("No regions committed; nothing to extract.".to_string());
            return;
        }

        let output_dir = PathBuf::from(self.output_dir.trim());
        let images = session.images;
        let threshold = self.config.matching.threshold;
        let reference_dir = self
            .config
            .matching
            .reference_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("card_db"));
        let mirror = self.log_mirror.clone();
        mirror.lock().clear();

        let (tx, rx) = unbounded();
        self.scan_rx = Some(rx);
        self.status = Some("Scanning...".to_string());

        std::thread::spawn(move || {
            let outcome = run_scan(&zones, &images, &output_dir, &reference_dir, threshold, mirror);
            let _ = tx.send(match outcome {
                Ok((records, report)) => ScanOutcome::Done { records, report },
                Err(e) => {
                    error!(error = %e, "scan failed");
                    ScanOutcome::Failed(e.to_string())
                }
            });
        });
    }

    fn start_enrichment(&mut self) {
        let csv = PathBuf::from(self.csv_path.trim());
        if !csv.is_file() {
            self.status = Some(format!("CSV file not found: {}", csv.display()));
            return;
        }
        let provider = match EbayProvider::new() {
            Ok(p) => p,
            Err(e) => {
                self.status = Some(format!("Price provider unavailable: {e}"));
                return;
            }
        };

        self.enrich_cancel = Arc::new(AtomicBool::new(false));
        let opts = EnrichOptions {
            policy: self.policy,
            pacing: Duration::from_secs(self.config.pricing.pacing_secs),
            max_samples: self.config.pricing.max_samples,
        };
        self.enrich_rx = Some(spawn_enrich(
            csv,
            self.key_column.trim().to_string(),
            Box::new(provider),
            opts,
            self.enrich_cancel.clone(),
        ));
        self.status = Some("Fetching prices...".to_string());
    }

    fn poll_workers(&mut self) {
        if let Some(rx) = self.scan_rx.take() {
            match rx.try_recv() {
                Ok(ScanOutcome::Done { records, report }) => {
                    self.status = Some(match (&report, records) {
                        (_, 0) => "Scan finished: nothing to extract.".to_string(),
                        (Some(path), n) => {
                            self.csv_path = path.display().to_string();
                            format!("Scan complete: {n} records. Report: {}", path.display())
                        }
                        (None, n) => format!("Scan complete: {n} records."),
                    });
                }
                Ok(ScanOutcome::Failed(e)) => self.status = Some(format!("Scan failed: {e}")),
                Err(_) => self.scan_rx = Some(rx),
            }
        }

        if let Some(rx) = self.enrich_rx.take() {
            let mut finished = false;
            while let Ok(msg) = rx.try_recv() {
                match msg {
                    EnrichProgress::Row(line) => self.log_mirror.lock().push(line),
                    EnrichProgress::Done(path) => {
                        self.status = Some(format!("Prices written to {}", path.display()));
                        finished = true;
                    }
                    EnrichProgress::Failed(e) => {
                        self.status = Some(format!("Price lookup failed: {e}"));
                        finished = true;
                    }
                }
            }
            if !finished {
                self.enrich_rx = Some(rx);
            }
        }
    }

    fn editor_window(&mut self, ctx: &egui::Context) {
        let Some(mut session) = self.session.take() else { return };
        let mut confirm = false;
        let mut cancel = false;

        egui::Window::new("Select Capture Regions")
            .default_size([760.0, 560.0])
            .show(ctx, |ui| {
                editor_controls(ui, &mut session, &mut confirm, &mut cancel);
                ui.separator();

                let index = session.editor.image_index();
                match load_texture(ctx, &mut session.textures, &session.images, index) {
                    Ok(texture) => canvas::show(ui, &mut session.editor, &texture),
                    Err(e) => {
                        ui.colored_label(egui::Color32::RED, format!("Failed to load image: {e}"));
                    }
                }
            });

        if confirm {
            self.start_scan(session);
        } else if !cancel {
            self.session = Some(session);
        }
    }
}

impl eframe::App for CardScanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_workers();
        if self.scan_rx.is_some() || self.enrich_rx.is_some() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Trading Card Scanner");
            ui.add_space(8.0);

            egui::Grid::new("paths").num_columns(2).show(ui, |ui| {
                ui.label("Input folder:");
                ui.text_edit_singleline(&mut self.input_dir);
                ui.end_row();

                ui.label("Output folder:");
                ui.text_edit_singleline(&mut self.output_dir);
                ui.end_row();
            });

            ui.add_space(4.0);
            let scanning = self.scan_rx.is_some() || self.session.is_some();
            if ui.add_enabled(!scanning, egui::Button::new("Select Regions & Scan")).clicked() {
                self.begin_region_selection();
            }

            ui.separator();
            ui.heading("Price Lookup");

            egui::Grid::new("pricing").num_columns(2).show(ui, |ui| {
                ui.label("Report CSV:");
                ui.text_edit_singleline(&mut self.csv_path);
                ui.end_row();

                ui.label("Search column:");
                ui.text_edit_singleline(&mut self.key_column);
                ui.end_row();

                ui.label("Policy:");
                egui::ComboBox::from_id_salt("policy")
                    .selected_text(self.policy.label())
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.policy, PricePolicy::RobustMedian, "Median");
                        ui.selectable_value(
                            &mut self.policy,
                            PricePolicy::RecentFiltered,
                            "Most Recent",
                        );
                    });
                ui.end_row();
            });

            ui.horizontal(|ui| {
                let enriching = self.enrich_rx.is_some();
                if ui.add_enabled(!enriching, egui::Button::new("Fetch Prices")).clicked() {
                    self.start_enrichment();
                }
                if enriching && ui.button("Cancel").clicked() {
                    self.enrich_cancel.store(true, Ordering::SeqCst);
                }
            });

            if let Some(status) = &self.status {
                ui.add_space(6.0);
                ui.label(status);
            }

            ui.separator();
            egui::ScrollArea::vertical()
                .auto_shrink([false, true])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in self.log_mirror.lock().iter() {
                        ui.monospace(line);
                    }
                });
        });

        self.editor_window(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let trimmed = |s: &str| (!s.trim().is_empty()).then(|| PathBuf::from(s.trim()));
        self.config.scan.input_dir = trimmed(&self.input_dir);
        self.config.scan.output_dir = trimmed(&self.output_dir);
        self.config.pricing.policy = self.policy;

        if let Ok(dir) = crate::config::get_config_dir() {
            if let Err(e) = crate::config::save_config(&self.config, &dir.join("config.toml")) {
                error!(error = %e, "failed to save configuration");
            }
        }
    }
}

/// Zone list, add-zone input, zoom and image navigation, confirm/cancel.
fn editor_controls(
    ui: &mut egui::Ui,
    session: &mut EditorSession,
    confirm: &mut bool,
    cancel: &mut bool,
) {
    let editor = &mut session.editor;
    let mut events: Vec<EditorEvent> = Vec::new();

    ui.horizontal(|ui| {
        if ui.button("<").clicked() {
            events.push(EditorEvent::PrevImage);
        }
        ui.label(format!("Image {}/{}", editor.image_index() + 1, editor.image_count()));
        if ui.button(">").clicked() {
            events.push(EditorEvent::NextImage);
        }

        ui.separator();
        let mut zoom = editor.zoom();
        if ui
            .add(egui::Slider::new(&mut zoom, crate::editor::MIN_ZOOM..=crate::editor::MAX_ZOOM)
                .text("Zoom"))
            .changed()
        {
            events.push(EditorEvent::SetZoom { zoom });
        }

        ui.separator();
        if ui.button("OK").clicked() {
            *confirm = true;
        }
        if ui.button("Cancel").clicked() {
            *cancel = true;
        }
    });

    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut session.zone_name_input);
        if ui.button("+ Add Capture Zone").clicked() {
            let name = if session.zone_name_input.trim().is_empty() {
                format!("Zone {}", editor.zones().len() + 1)
            } else {
                session.zone_name_input.trim().to_string()
            };
            events.push(EditorEvent::AddZone { name });
            session.zone_name_input.clear();
        }
    });

    for (idx, zone) in editor.zones().iter().enumerate() {
        let active = editor.active_index() == Some(idx);
        ui.horizontal(|ui| {
            if ui.radio(active, "").clicked() {
                events.push(EditorEvent::SelectZone { index: idx });
            }
            let mut name = zone.name.clone();
            if ui.add(egui::TextEdit::singleline(&mut name).desired_width(120.0)).changed() {
                events.push(EditorEvent::RenameZone { index: idx, name });
            }
            match zone.rect {
                Some(r) => ui.monospace(format!(
                    "({:.0}, {:.0}, {:.0}, {:.0})",
                    r.x1, r.y1, r.x2, r.y2
                )),
                None => ui.monospace("(not drawn)"),
            };

            let mut selected = zone.match_policy.clone();
            let label = match &selected {
                MatchPolicy::None => "No matching".to_string(),
                MatchPolicy::ReferenceList(domain) => domain.clone(),
            };
            egui::ComboBox::from_id_salt(("match_policy", idx))
                .selected_text(label)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut selected, MatchPolicy::None, "No matching");
                    for domain in ReferenceLibrary::domains() {
                        ui.selectable_value(
                            &mut selected,
                            MatchPolicy::ReferenceList(domain.to_string()),
                            domain,
                        );
                    }
                });
            if selected != zone.match_policy {
                events.push(EditorEvent::SetMatchPolicy { index: idx, policy: selected });
            }
        });
    }

    for event in events {
        editor.handle_event(event);
    }
}

/// Scan worker body: session log, reference preflight, extraction, report.
fn run_scan(
    zones: &[crate::editor::CaptureZone],
    images: &[PathBuf],
    output_dir: &Path,
    reference_dir: &Path,
    threshold: f32,
    mirror: LogMirror,
) -> Result<(usize, Option<PathBuf>)> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output folder {}", output_dir.display()))?;

    let mut library = ReferenceLibrary::new(reference_dir);
    let lists = resolve_reference_lists(zones, &mut library)?;

    let mut log = SessionLog::create(output_dir)?.with_mirror(mirror);
    let recognizer = TesseractRecognizer::new();
    let engine = ExtractionEngine::new(zones, &recognizer)
        .with_reference_lists(lists)
        .with_match_threshold(threshold);

    let batch = engine.run(images, output_dir, &mut log)?;
    if batch.records.is_empty() {
        return Ok((0, None));
    }

    let zone_names: Vec<String> = zones.iter().map(|z| z.name.clone()).collect();
    let report_path = report::write_scan_report(output_dir, &batch.records, &zone_names)?;
    info!(records = batch.records.len(), "scan finished");
    Ok((batch.records.len(), Some(report_path)))
}

/// Images in the folder (jpg/jpeg/png), sorted by name for a stable batch
/// order.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    matches!(ext.as_str(), "jpg" | "jpeg" | "png")
                })
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}

/// Lazily load and cache the texture for one reference image.
fn load_texture(
    ctx: &egui::Context,
    textures: &mut HashMap<usize, egui::TextureHandle>,
    images: &[PathBuf],
    index: usize,
) -> Result<egui::TextureHandle> {
    if let Some(texture) = textures.get(&index) {
        return Ok(texture.clone());
    }

    let path = &images[index];
    let img = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());

    let texture = ctx.load_texture(
        format!("reference_{index}"),
        color_image,
        egui::TextureOptions::LINEAR,
    );
    textures.insert(index, texture.clone());
    Ok(texture)
}

/// Run the GUI (blocking).
pub fn run_app(config: AppConfig) -> Result<()> {
    let app = CardScanApp::new(config);
    eframe::run_native(
        "Card Scanner",
        CardScanApp::options(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {e}"))
}
