
use anyhow::{Context, anyhow};
use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DETECTION_MODEL_FILE: &str = "text-detection.rten";
pub const RECOGNITION_MODEL_FILE: &str = "text-recognition.rten";

/// Reads the text printed in an image
pub trait TextRecognition: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> anyhow::Result<String>;
}

/// OCR backed by `ocrs` detection and recognition models
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load both models from `models_dir`
    #[inline]
    pub fn load(models_dir: &Path) -> anyhow::Result<Self> {
        let detection_model = load_model(&models_dir.join(DETECTION_MODEL_FILE))?;
        let recognition_model = load_model(&models_dir.join(RECOGNITION_MODEL_FILE))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .context("Failed to initialize OCR engine")?;

        info!("OCR models loaded from {}", models_dir.display());
        Ok(Self { engine })
    }
}

impl TextRecognition for OcrsRecognizer {
    fn recognize(&self, image: &RgbImage) -> anyhow::Result<String> {
        let source = ImageSource::from_bytes(image.as_raw(), image.dimensions())
            .map_err(|e| anyhow!("invalid image buffer: {:?}", e))?;
        let input = self
            .engine
            .prepare_input(source)
            .context("Failed to prepare OCR input")?;
        let text = self
            .engine
            .get_text(&input)
            .context("Text recognition failed")?;

        debug!("OCR recognised {} chars", text.len());
        Ok(text)
    }
}

/// Both model files expected under `models_dir`
#[inline]
pub fn model_paths(models_dir: &Path) -> [PathBuf; 2] {
    [
        models_dir.join(DETECTION_MODEL_FILE),
        models_dir.join(RECOGNITION_MODEL_FILE),
    ]
}

fn load_model(path: &Path) -> anyhow::Result<Model> {
    if !path.is_file() {
        anyhow::bail!("OCR model not found: {}", path.display());
    }
    Model::load_file(path).with_context(|| format!("Failed to load OCR model {}", path.display()))
}
