//! Tesseract-backed recognizer
//!
//! Uses the system tesseract binary through rusty-tesseract. Regions are
//! single lines of card text, so PSM 7 (treat the image as one text line)
//! gives the best results.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use image::DynamicImage;
use rusty_tesseract::{Args, Image};

use super::{prepare_region, Recognizer};

/// Recognizer that shells out to the system tesseract installation.
pub struct TesseractRecognizer {
    args: Args,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            args: Args {
                lang: "eng".to_string(),
                config_variables: HashMap::new(),
                dpi: Some(150),
                psm: Some(7),
                oem: Some(3),
            },
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, region: &DynamicImage) -> Result<String> {
        let prepared = prepare_region(region);
        let tess_img = Image::from_dynamic_image(&prepared)
            .map_err(|e| anyhow!("failed to convert region for tesseract: {e}"))?;
        let text = rusty_tesseract::image_to_string(&tess_img, &self.args)
            .map_err(|e| anyhow!("tesseract recognition failed: {e}"))?;
        Ok(text.trim().to_string())
    }
}
