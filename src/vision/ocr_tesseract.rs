//! Tesseract backend
//!
//! Holds a single tesseract handle for the lifetime of the worker. The handle
//! is created when languages are configured and reused for every region.

use std::path::Path;
use tesseract::Tesseract;
use tracing::{debug, info, warn};

use super::{RecognitionError, TextRecognizer, TESSERACT_ENGINE};

pub struct TesseractEngine {
    /// tessdata directory, `None` for the library default
    datapath: Option<String>,
    /// Languages joined with '+', as tesseract expects
    languages: String,
    handle: Option<Tesseract>,
}

impl TesseractEngine {
    pub fn new(datapath: Option<&Path>) -> Self {
        Self {
            datapath: datapath.map(|p| p.to_string_lossy().into_owned()),
            languages: "eng".to_string(),
            handle: None,
        }
    }

    fn init(&self) -> Result<Tesseract, RecognitionError> {
        Tesseract::new(self.datapath.as_deref(), Some(self.languages.as_str())).map_err(|e| {
            RecognitionError::Engine(format!("failed to initialize tesseract ({}): {}", self.languages, e))
        })
    }
}

impl TextRecognizer for TesseractEngine {
    fn name(&self) -> &'static str {
        TESSERACT_ENGINE
    }

    fn configure(&mut self, languages: &[String]) -> Result<(), RecognitionError> {
        if languages.is_empty() {
            return Err(RecognitionError::NoLanguages);
        }
        self.languages = languages.join("+");
        self.handle = Some(self.init()?);
        info!("Tesseract languages: {}", self.languages);
        Ok(())
    }

    fn warm_up(&mut self) -> Result<(), RecognitionError> {
        if self.handle.is_none() {
            self.handle = Some(self.init()?);
        }
        debug!("Tesseract handle ready");
        Ok(())
    }

    fn recognize(&mut self, image_png: &[u8]) -> Result<String, RecognitionError> {
        // The binding consumes the handle on each call; a failed call drops it
        // and the next region starts from a fresh one.
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => {
                warn!("Reinitializing tesseract handle");
                self.init()?
            }
        };

        let mut handle = handle
            .set_image_from_mem(image_png)
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;
        let text = handle
            .get_text()
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;
        self.handle = Some(handle);

        Ok(text.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_requires_languages() {
        let mut engine = TesseractEngine::new(None);
        assert!(matches!(engine.configure(&[]), Err(RecognitionError::NoLanguages)));
        assert!(engine.handle.is_none());
    }

    #[test]
    fn test_datapath_is_kept() {
        let engine = TesseractEngine::new(Some(Path::new("/usr/share/tessdata")));
        assert_eq!(engine.datapath.as_deref(), Some("/usr/share/tessdata"));
        assert_eq!(engine.languages, "eng");
        assert_eq!(engine.name(), "tesseract");
    }
}
