//! One screenshot → validated appliance records, without side effects.

use std::path::Path;

use serde::Serialize;

use super::assembly::assemble;
use super::recognition::{OcrEngine, RecognitionError};
use super::tokens::{scan_document, ClassifiedTokens, TokenClassifier};
use super::validation::{RecordValidator, Rejection, Verdict};
use crate::models::ApplianceRecord;

/// Everything learned from one screenshot.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotReading {
    pub word_count: usize,
    pub tokens: ClassifiedTokens,
    pub appliances: Vec<ApplianceRecord>,
    pub rejection: Option<Rejection>,
}

impl ScreenshotReading {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Recognition → classification → assembly → validation.
pub struct RecordReader {
    engine: Box<dyn OcrEngine>,
    classifier: TokenClassifier,
    validator: RecordValidator,
}

impl RecordReader {
    pub fn new(
        engine: Box<dyn OcrEngine>,
        classifier: TokenClassifier,
        validator: RecordValidator,
    ) -> Self {
        Self {
            engine,
            classifier,
            validator,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn read(&self, image_path: &Path) -> Result<ScreenshotReading, RecognitionError> {
        let doc = self.engine.recognize(image_path)?;
        let tokens = scan_document(&doc, &self.classifier);
        let appliances = assemble(&tokens);

        let rejection = match self.validator.validate(&appliances) {
            Verdict::Accepted => None,
            Verdict::Rejected(reason) => Some(reason),
        };

        tracing::debug!(
            image = %image_path.display(),
            words = doc.word_count(),
            appliances = appliances.len(),
            accepted = rejection.is_none(),
            "Screenshot read"
        );

        Ok(ScreenshotReading {
            word_count: doc.word_count(),
            tokens,
            appliances,
            rejection,
        })
    }
}
