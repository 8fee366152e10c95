//! Extraction engine
//!
//! Applies finalized capture zones to every image in a batch: crop, recognize,
//! fuzzy-match, derive a collision-free output filename, copy the source
//! image, and emit one [`Record`] per image plus session log lines. Per-item
//! failures are absorbed as data; only preflight and environment-fatal errors
//! escape.

pub mod sanitize;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::editor::{CaptureZone, MatchPolicy};
use crate::matcher::{self, ReferenceError, ReferenceLibrary};
use crate::session::SessionLog;
use crate::vision::{crop_zone, Recognizer};

/// Structured per-image output: file locations plus one text field per zone.
#[derive(Debug, Clone)]
pub struct Record {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Zone name -> recognized (and possibly fuzzy-matched) text. Keys are
    /// exactly the zone names of the run, for every record in the batch.
    pub fields: HashMap<String, String>,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<Record>,
    pub images_processed: usize,
}

impl BatchReport {
    /// True when the run had nothing to do (no zones or no images).
    pub fn is_noop(&self) -> bool {
        self.images_processed == 0 && self.records.is_empty()
    }
}

/// Preload the reference list for every zone with a `ReferenceList` policy.
///
/// Surfacing unknown-domain and missing-list conditions here keeps them ahead
/// of any side effect of the batch itself.
pub fn resolve_reference_lists(
    zones: &[CaptureZone],
    library: &mut ReferenceLibrary,
) -> Result<HashMap<String, Vec<String>>, ReferenceError> {
    let mut lists = HashMap::new();
    for zone in zones {
        if let MatchPolicy::ReferenceList(domain) = &zone.match_policy {
            if !lists.contains_key(domain) {
                let entries = library.load(domain)?.to_vec();
                lists.insert(domain.clone(), entries);
            }
        }
    }
    Ok(lists)
}

pub struct ExtractionEngine<'a> {
    zones: &'a [CaptureZone],
    recognizer: &'a dyn Recognizer,
    /// Resolved reference lists keyed by domain, from [`resolve_reference_lists`].
    reference_lists: HashMap<String, Vec<String>>,
    match_threshold: f32,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(zones: &'a [CaptureZone], recognizer: &'a dyn Recognizer) -> Self {
        Self {
            zones,
            recognizer,
            reference_lists: HashMap::new(),
            match_threshold: matcher::DEFAULT_THRESHOLD,
        }
    }

    pub fn with_reference_lists(mut self, lists: HashMap<String, Vec<String>>) -> Self {
        self.reference_lists = lists;
        self
    }

    pub fn with_match_threshold(mut self, threshold: f32) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Run the batch. Images are processed strictly in order; each image's
    /// copy is committed before the next collision check, so the output
    /// directory must have no other writer.
    pub fn run(
        &self,
        images: &[PathBuf],
        output_dir: &Path,
        log: &mut SessionLog,
    ) -> Result<BatchReport> {
        if self.zones.is_empty() || images.is_empty() {
            info!("nothing to extract (no zones or no images)");
            return Ok(BatchReport::default());
        }

        let images_dir = output_dir.join("images");
        fs::create_dir_all(&images_dir).with_context(|| {
            format!("failed to create output directory {}", images_dir.display())
        })?;

        log.line(format!("Scan started at {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
        for zone in self.zones {
            let r = zone.rect;
            log.line(format!(
                "Zone '{}': ({:.0}, {:.0}, {:.0}, {:.0})",
                zone.name, r.x1, r.y1, r.x2, r.y2
            ));
        }
        log.line(String::new());

        let mut records = Vec::new();

        for (position, input_path) in images.iter().enumerate() {
            let display_name = input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input_path.display().to_string());

            let img = match image::open(input_path) {
                Ok(img) => img,
                Err(e) => {
                    warn!(path = %input_path.display(), error = %e, "failed to open image");
                    log.line(format!("[{display_name}] -> failed to open image: {e}"));
                    continue;
                }
            };

            let fields = self.extract_fields(&img, &display_name, log);

            let primary_text = &fields[&self.zones[0].name];
            let mut base = sanitize::sanitize_name(primary_text);
            if base.is_empty() {
                base = sanitize::fallback_name(position + 1);
            }

            let ext = input_path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();

            let output_path = sanitize::resolve_collision(&images_dir, &base, &ext);
            if let Err(e) = fs::copy(input_path, &output_path) {
                warn!(path = %input_path.display(), error = %e, "failed to copy image");
                log.line(format!("[{display_name}] -> failed to copy: {e}"));
                continue;
            }

            let saved_name = output_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            log.line(format!(
                "[{display_name}] -> OCR: '{primary_text}' -> saved as: {saved_name}"
            ));

            records.push(Record {
                input_path: input_path.clone(),
                output_path,
                fields,
            });
        }

        log.line(String::new());
        log.line(format!("Scan complete. {} images processed.", images.len()));
        log.line(format!("{} records produced.", records.len()));
        info!(images = images.len(), records = records.len(), "batch extraction finished");

        Ok(BatchReport {
            records,
            images_processed: images.len(),
        })
    }

    /// Recognize every zone of one image. A zone's recognition failure leaves
    /// that field empty and moves on.
    fn extract_fields(
        &self,
        img: &image::DynamicImage,
        display_name: &str,
        log: &mut SessionLog,
    ) -> HashMap<String, String> {
        let mut fields = HashMap::new();

        for zone in self.zones {
            let raw = match crop_zone(img, &zone.rect) {
                Some(region) => match self.recognizer.recognize(&region) {
                    Ok(text) => text.trim().to_string(),
                    Err(e) => {
                        warn!(zone = %zone.name, error = %e, "recognition failed");
                        log.line(format!("[{display_name}] zone '{}': OCR FAILED: {e}", zone.name));
                        String::new()
                    }
                },
                None => String::new(),
            };

            let value = match &zone.match_policy {
                MatchPolicy::None => raw,
                MatchPolicy::ReferenceList(domain) => {
                    let matched = self
                        .reference_lists
                        .get(domain)
                        .and_then(|list| matcher::best_match(&raw, list, self.match_threshold));
                    // Below-threshold matches keep the raw OCR text rather
                    // than discarding a plausible reading.
                    matched.map(str::to_string).unwrap_or(raw)
                }
            };

            fields.insert(zone.name.clone(), value);
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::ZoneRect;
    use anyhow::anyhow;
    use image::RgbaImage;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Recognizer that replays scripted responses in call order
    /// (image-major, zone-minor).
    struct ScriptedRecognizer {
        responses: RefCell<VecDeque<Result<String>>>,
    }

    impl ScriptedRecognizer {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
            }
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn recognize(&self, _region: &image::DynamicImage) -> Result<String> {
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn zone(name: &str) -> CaptureZone {
        CaptureZone {
            name: name.to_string(),
            rect: ZoneRect { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0 },
            match_policy: MatchPolicy::None,
        }
    }

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::new(20, 20).save(&path).unwrap();
        path
    }

    #[test]
    fn test_sanitized_primary_text_names_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let images = vec![write_image(input.path(), "scan1.png")];

        let zones = vec![zone("Card Name")];
        let recognizer = ScriptedRecognizer::new(vec![Ok("Base Set Charizard".into())]);
        let engine = ExtractionEngine::new(&zones, &recognizer);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(
            report.records[0].output_path,
            output.path().join("images").join("Base_Set_Charizard.png")
        );
        assert!(report.records[0].output_path.exists());
        // Source is copied, never moved.
        assert!(images[0].exists());
    }

    #[test]
    fn test_duplicate_names_get_incrementing_suffixes() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let images = vec![
            write_image(input.path(), "a.png"),
            write_image(input.path(), "b.png"),
        ];

        let zones = vec![zone("Card Name")];
        let recognizer = ScriptedRecognizer::new(vec![Ok("X".into()), Ok("X".into())]);
        let engine = ExtractionEngine::new(&zones, &recognizer);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        let names: Vec<_> = report
            .records
            .iter()
            .map(|r| r.output_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["X.png", "X_1.png"]);
    }

    #[test]
    fn test_empty_primary_text_falls_back_to_position() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let images = vec![
            write_image(input.path(), "a.png"),
            write_image(input.path(), "b.png"),
        ];

        let zones = vec![zone("Card Name")];
        let recognizer = ScriptedRecognizer::new(vec![Ok("?!".into()), Ok("Mew".into())]);
        let engine = ExtractionEngine::new(&zones, &recognizer);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        assert_eq!(
            report.records[0].output_path.file_name().unwrap().to_string_lossy(),
            "SCAN_1.png"
        );
        assert_eq!(
            report.records[1].output_path.file_name().unwrap().to_string_lossy(),
            "Mew.png"
        );
    }

    #[test]
    fn test_recognition_failure_leaves_field_empty_but_keeps_record() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let images = vec![write_image(input.path(), "a.png")];

        let zones = vec![zone("Card Name"), zone("Set Number")];
        let recognizer = ScriptedRecognizer::new(vec![
            Ok("Alakazam".into()),
            Err(anyhow!("ocr timeout")),
        ]);
        let engine = ExtractionEngine::new(&zones, &recognizer);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        assert_eq!(report.images_processed, 1);
        assert_eq!(report.records.len(), 1);

        let fields = &report.records[0].fields;
        assert_eq!(fields["Card Name"], "Alakazam");
        assert_eq!(fields["Set Number"], "");
    }

    #[test]
    fn test_no_zones_or_no_images_is_a_noop() {
        let output = tempfile::tempdir().unwrap();
        let recognizer = ScriptedRecognizer::new(vec![]);
        let mut log = SessionLog::in_memory();

        let report = ExtractionEngine::new(&[], &recognizer)
            .run(&[PathBuf::from("a.png")], output.path(), &mut log)
            .unwrap();
        assert!(report.is_noop());

        let zones = vec![zone("Card Name")];
        let report = ExtractionEngine::new(&zones, &recognizer)
            .run(&[], output.path(), &mut log)
            .unwrap();
        assert!(report.is_noop());
        // A no-op writes nothing.
        assert!(!output.path().join("images").exists());
        assert!(log.lines().iter().all(|l| !l.contains("Scan started")));
    }

    #[test]
    fn test_reference_list_policy_replaces_raw_text() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let images = vec![write_image(input.path(), "a.png")];

        let mut zones = vec![zone("Card Name")];
        zones[0].match_policy = MatchPolicy::ReferenceList("Pokemon Name".into());

        let mut lists = HashMap::new();
        lists.insert(
            "Pokemon Name".to_string(),
            vec!["Pikachu".to_string(), "Raichu".to_string()],
        );

        let recognizer = ScriptedRecognizer::new(vec![Ok("pikachu".into())]);
        let engine = ExtractionEngine::new(&zones, &recognizer).with_reference_lists(lists);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        assert_eq!(report.records[0].fields["Card Name"], "Pikachu");
    }

    #[test]
    fn test_below_threshold_match_keeps_raw_text() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let images = vec![write_image(input.path(), "a.png")];

        let mut zones = vec![zone("Card Name")];
        zones[0].match_policy = MatchPolicy::ReferenceList("Pokemon Name".into());

        let mut lists = HashMap::new();
        lists.insert("Pokemon Name".to_string(), vec!["Blastoise".to_string()]);

        let recognizer = ScriptedRecognizer::new(vec![Ok("Charizard".into())]);
        let engine = ExtractionEngine::new(&zones, &recognizer).with_reference_lists(lists);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        assert_eq!(report.records[0].fields["Card Name"], "Charizard");
    }

    #[test]
    fn test_unopenable_image_is_skipped_and_logged() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let bogus = input.path().join("broken.png");
        fs::write(&bogus, b"not an image").unwrap();
        let images = vec![bogus, write_image(input.path(), "ok.png")];

        let zones = vec![zone("Card Name")];
        let recognizer = ScriptedRecognizer::new(vec![Ok("Gengar".into())]);
        let engine = ExtractionEngine::new(&zones, &recognizer);
        let mut log = SessionLog::in_memory();

        let report = engine.run(&images, output.path(), &mut log).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.images_processed, 2);
        assert!(log.lines().iter().any(|l| l.contains("failed to open image")));
    }

    #[test]
    fn test_resolve_reference_lists_preflight_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = ReferenceLibrary::new(dir.path());

        let mut zones = vec![zone("Card Name")];
        zones[0].match_policy = MatchPolicy::ReferenceList("Digimon".into());
        assert!(matches!(
            resolve_reference_lists(&zones, &mut library),
            Err(ReferenceError::UnknownDomain(_))
        ));

        zones[0].match_policy = MatchPolicy::ReferenceList("Pokemon Name".into());
        assert!(matches!(
            resolve_reference_lists(&zones, &mut library),
            Err(ReferenceError::MissingList(_))
        ));

        fs::write(dir.path().join("pokemon_name.txt"), "Pikachu\n").unwrap();
        let lists = resolve_reference_lists(&zones, &mut library).unwrap();
        assert_eq!(lists["Pokemon Name"], vec!["Pikachu".to_string()]);
    }
}
