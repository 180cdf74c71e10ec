//! Vision/OCR Layer
//!
//! Text recognition on captured frames. Engines are image-in, string-out
//! wrappers behind [`TextRecognizer`]; the [`worker`] owns one engine and
//! runs it on its own thread.

pub mod ocr_preprocess;
#[cfg(feature = "engine-tesseract")]
pub mod ocr_tesseract;
pub mod worker;

use std::path::Path;
use thiserror::Error;

pub use worker::{JobOutcome, RecognitionWorker, WorkerHandle};

/// Engine name that disables recognition
pub const NO_ENGINE: &str = "none";
/// Engine name selecting the tesseract library
pub const TESSERACT_ENGINE: &str = "tesseract";

/// Engine used when the configuration names none
pub fn default_engine() -> &'static str {
    if cfg!(feature = "engine-tesseract") {
        TESSERACT_ENGINE
    } else {
        NO_ENGINE
    }
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("no recognition languages given")]
    NoLanguages,
    #[error("failed to encode region image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("recognition engine failed: {0}")]
    Engine(String),
    #[error("unsupported recognition engine: {0}")]
    Unsupported(String),
}

/// Common interface for text recognition engines
pub trait TextRecognizer: Send {
    fn name(&self) -> &'static str;

    /// Set the recognition languages, in priority order
    fn configure(&mut self, languages: &[String]) -> Result<(), RecognitionError>;

    /// Check that the engine is usable before the pipeline starts
    fn warm_up(&mut self) -> Result<(), RecognitionError> {
        Ok(())
    }

    /// Recognize text in a PNG-encoded image
    fn recognize(&mut self, image_png: &[u8]) -> Result<String, RecognitionError>;
}

/// Engine that recognizes nothing, for dry runs without an OCR install
#[derive(Debug, Default)]
pub struct NoopRecognizer;

impl TextRecognizer for NoopRecognizer {
    fn name(&self) -> &'static str {
        NO_ENGINE
    }

    fn configure(&mut self, _languages: &[String]) -> Result<(), RecognitionError> {
        Ok(())
    }

    fn recognize(&mut self, _image_png: &[u8]) -> Result<String, RecognitionError> {
        Ok(String::new())
    }
}

/// Build an engine by name: "none" or "tesseract"
pub fn create_recognizer(engine: &str, tessdata: Option<&Path>) -> Result<Box<dyn TextRecognizer>, RecognitionError> {
    match engine {
        NO_ENGINE => Ok(Box::new(NoopRecognizer)),
        TESSERACT_ENGINE => tesseract_engine(tessdata),
        other => Err(RecognitionError::Unsupported(other.to_string())),
    }
}

#[cfg(feature = "engine-tesseract")]
fn tesseract_engine(tessdata: Option<&Path>) -> Result<Box<dyn TextRecognizer>, RecognitionError> {
    Ok(Box::new(ocr_tesseract::TesseractEngine::new(tessdata)))
}

#[cfg(not(feature = "engine-tesseract"))]
fn tesseract_engine(_tessdata: Option<&Path>) -> Result<Box<dyn TextRecognizer>, RecognitionError> {
    Err(RecognitionError::Unsupported(format!(
        "{} (rebuild with --features engine-tesseract)",
        TESSERACT_ENGINE
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_recognizer() {
        assert_eq!(create_recognizer(NO_ENGINE, None).unwrap().name(), NO_ENGINE);
        assert!(matches!(
            create_recognizer("paddle", None),
            Err(RecognitionError::Unsupported(_))
        ));
    }

    #[cfg(not(feature = "engine-tesseract"))]
    #[test]
    fn test_tesseract_needs_feature() {
        assert_eq!(default_engine(), NO_ENGINE);
        let err = create_recognizer(TESSERACT_ENGINE, None).err().unwrap();
        assert!(err.to_string().contains("engine-tesseract"));
    }

    #[test]
    fn test_noop_recognizer() {
        let mut engine = NoopRecognizer;
        engine.configure(&[]).unwrap();
        assert_eq!(engine.recognize(b"anything").unwrap(), "");
    }
}
