pub mod types;
pub mod tsv;
pub mod tesseract;

pub use types::*;
pub use tesseract::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("Tesseract output is not valid UTF-8: {0}")]
    Encoding(String),
}
