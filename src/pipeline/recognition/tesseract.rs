use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::tsv::parse_tsv_document;
use super::types::{OcrEngine, RecognizedDocument};
use super::RecognitionError;

/// Runs the `tesseract` command-line tool and parses its TSV output.
pub struct TesseractCli {
    binary: PathBuf,
    languages: String,
    tessdata_dir: Option<PathBuf>,
    page_segmentation_mode: Option<u8>,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, languages: &str) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.to_string(),
            tessdata_dir: None,
            page_segmentation_mode: None,
        }
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir;
        self
    }

    /// Tesseract `--psm` value. The status display is a sparse grid, so
    /// 11 ("sparse text") often beats the default.
    pub fn with_page_segmentation_mode(mut self, psm: Option<u8>) -> Self {
        self.page_segmentation_mode = psm;
        self
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path).arg("stdout").arg("-l").arg(&self.languages);
        if let Some(ref dir) = self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        if let Some(psm) = self.page_segmentation_mode {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd.arg("tsv").stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract-cli"
    }

    fn recognize(&self, image_path: &Path) -> Result<RecognizedDocument, RecognitionError> {
        if !image_path.is_file() {
            return Err(RecognitionError::ImageNotFound(image_path.to_path_buf()));
        }

        let output = self.command(image_path).output().map_err(|e| {
            RecognitionError::OcrInit(format!(
                "Failed to execute {}: {e}",
                self.binary.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8(output.stdout)
            .map_err(|e| RecognitionError::Encoding(e.to_string()))?;

        let doc = parse_tsv_document(&tsv);
        tracing::debug!(
            image = %image_path.display(),
            words = doc.word_count(),
            "Tesseract CLI recognition complete"
        );
        Ok(doc)
    }
}

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Requires `<lang>.traineddata` for every requested language.
    pub fn new(tessdata_dir: &Path, languages: &str) -> Result<Self, RecognitionError> {
        for lang in languages.split('+') {
            if !tessdata_dir.join(format!("{lang}.traineddata")).exists() {
                return Err(RecognitionError::TessdataNotFound(tessdata_dir.to_path_buf()));
            }
        }

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            languages: languages.to_string(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn name(&self) -> &'static str {
        "tesseract-bundled"
    }

    fn recognize(&self, image_path: &Path) -> Result<RecognizedDocument, RecognitionError> {
        let tessdata_str = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| RecognitionError::OcrInit("Invalid tessdata path".into()))?;
        let image_str = image_path
            .to_str()
            .ok_or_else(|| RecognitionError::ImageNotFound(image_path.to_path_buf()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata_str), Some(&self.languages))
            .map_err(|e| RecognitionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image(image_str)
            .map_err(|e| RecognitionError::OcrProcessing(format!("{e:?}")))?
            .recognize()
            .map_err(|e| RecognitionError::OcrProcessing(format!("{e:?}")))?;

        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| RecognitionError::OcrProcessing(format!("{e:?}")))?;

        Ok(parse_tsv_document(&tsv))
    }
}

/// Mock OCR engine for unit testing without Tesseract.
///
/// Returns the default token stream for every image unless a stream was
/// registered for that file name.
pub struct MockOcrEngine {
    default_tokens: Vec<String>,
    per_file: HashMap<String, Vec<String>>,
    failing: Vec<String>,
}

impl MockOcrEngine {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            default_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            per_file: HashMap::new(),
            failing: Vec::new(),
        }
    }

    pub fn with_file(mut self, file_name: &str, tokens: &[&str]) -> Self {
        self.per_file.insert(
            file_name.to_string(),
            tokens.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Recognition of `file_name` returns an error.
    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.failing.push(file_name.to_string());
        self
    }
}

impl OcrEngine for MockOcrEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn recognize(&self, image_path: &Path) -> Result<RecognizedDocument, RecognitionError> {
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.failing.contains(&file_name) {
            return Err(RecognitionError::OcrProcessing(format!(
                "mock failure for {file_name}"
            )));
        }

        let tokens = self.per_file.get(&file_name).unwrap_or(&self.default_tokens);
        let words: Vec<&str> = tokens.iter().map(String::as_str).collect();
        Ok(RecognizedDocument::from_lines(&[&words]))
    }
}
