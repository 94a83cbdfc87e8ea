use std::path::Path;

use serde::Serialize;

use super::RecognitionError;

/// Full recognition result for one image, nested the way Tesseract reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizedDocument {
    pub pages: Vec<RecognizedPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizedPage {
    pub page_number: usize,
    pub blocks: Vec<RecognizedBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizedBlock {
    pub lines: Vec<RecognizedLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizedLine {
    pub words: Vec<RecognizedWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedWord {
    pub value: String,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

/// Pixel bounding box of a word on the screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RecognizedDocument {
    /// Single page, single block, one line per entry of `lines`.
    pub fn from_lines(lines: &[&[&str]]) -> Self {
        let lines = lines
            .iter()
            .map(|words| RecognizedLine {
                words: words
                    .iter()
                    .map(|value| RecognizedWord {
                        value: value.to_string(),
                        confidence: 1.0,
                        bounding_box: None,
                    })
                    .collect(),
            })
            .collect();

        Self {
            pages: vec![RecognizedPage {
                page_number: 1,
                blocks: vec![RecognizedBlock { lines }],
            }],
        }
    }

    /// Words in traversal order: page, block, line, word.
    pub fn words(&self) -> impl Iterator<Item = &RecognizedWord> + '_ {
        self.pages
            .iter()
            .flat_map(|page| page.blocks.iter())
            .flat_map(|block| block.lines.iter())
            .flat_map(|line| line.words.iter())
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

/// Text recognition engine (allows mocking for tests)
pub trait OcrEngine: Send {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    fn recognize(&self, image_path: &Path) -> Result<RecognizedDocument, RecognitionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_follow_page_block_line_order() {
        let doc = RecognizedDocument {
            pages: vec![
                RecognizedPage {
                    page_number: 1,
                    blocks: vec![
                        RecognizedBlock {
                            lines: vec![
                                RecognizedLine {
                                    words: vec![word("a"), word("b")],
                                },
                                RecognizedLine {
                                    words: vec![word("c")],
                                },
                            ],
                        },
                        RecognizedBlock {
                            lines: vec![RecognizedLine {
                                words: vec![word("d")],
                            }],
                        },
                    ],
                },
                RecognizedPage {
                    page_number: 2,
                    blocks: vec![RecognizedBlock {
                        lines: vec![RecognizedLine {
                            words: vec![word("e")],
                        }],
                    }],
                },
            ],
        };

        let values: Vec<&str> = doc.words().map(|w| w.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(doc.word_count(), 5);
    }

    #[test]
    fn from_lines_builds_one_line_per_slice() {
        let doc = RecognizedDocument::from_lines(&[&["Trockner", "12345"], &["frei"]]);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].blocks[0].lines.len(), 2);
        assert_eq!(doc.word_count(), 3);
    }

    #[test]
    fn empty_document_has_no_words() {
        assert_eq!(RecognizedDocument::default().words().count(), 0);
    }

    fn word(value: &str) -> RecognizedWord {
        RecognizedWord {
            value: value.into(),
            confidence: 0.9,
            bounding_box: None,
        }
    }
}
