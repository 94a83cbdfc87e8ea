//! Tesseract TSV output → page/block/line/word hierarchy.
//!
//! TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
//! Level 5 rows are words; the numbering columns tell us which page, block and
//! line each word belongs to. Paragraphs are folded into their block.

use super::types::{
    BoundingBox, RecognizedBlock, RecognizedDocument, RecognizedLine, RecognizedPage,
    RecognizedWord,
};

const WORD_LEVEL: i32 = 5;
const TSV_FIELDS: usize = 12;

/// Position of a word row in the Tesseract layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowKey {
    page: u32,
    block: u32,
    paragraph: u32,
    line: u32,
}

pub fn parse_tsv_document(tsv: &str) -> RecognizedDocument {
    let mut doc = RecognizedDocument::default();
    let mut last: Option<RowKey> = None;

    // Skip header row
    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < TSV_FIELDS {
            continue;
        }

        match fields[0].parse::<i32>() {
            Ok(WORD_LEVEL) => {}
            _ => continue,
        }

        let key = match parse_key(&fields) {
            Some(k) => k,
            None => continue,
        };

        let value = fields[11].trim();
        if value.is_empty() {
            continue;
        }

        // Tesseract returns -1 for words it can't assign confidence to
        let confidence = match fields[10].trim().parse::<f32>() {
            Ok(c) if c >= 0.0 => c / 100.0,
            _ => 0.0,
        };

        let word = RecognizedWord {
            value: value.to_string(),
            confidence,
            bounding_box: parse_bounding_box(fields[6], fields[7], fields[8], fields[9]),
        };

        let new_page = last.map_or(true, |l| l.page != key.page);
        let new_block = new_page || last.map_or(true, |l| l.block != key.block);
        let new_line = new_block
            || last.map_or(true, |l| l.paragraph != key.paragraph || l.line != key.line);

        if new_page {
            doc.pages.push(RecognizedPage {
                page_number: key.page as usize,
                blocks: Vec::new(),
            });
        }
        let Some(page) = doc.pages.last_mut() else { continue };
        if new_block {
            page.blocks.push(RecognizedBlock::default());
        }
        let Some(block) = page.blocks.last_mut() else { continue };
        if new_line {
            block.lines.push(RecognizedLine::default());
        }
        let Some(line) = block.lines.last_mut() else { continue };
        line.words.push(word);

        last = Some(key);
    }

    doc
}

fn parse_key(fields: &[&str]) -> Option<RowKey> {
    Some(RowKey {
        page: fields[1].parse().ok()?,
        block: fields[2].parse().ok()?,
        paragraph: fields[3].parse().ok()?,
        line: fields[4].parse().ok()?,
    })
}

/// Returns None if any field fails to parse.
fn parse_bounding_box(left: &str, top: &str, width: &str, height: &str) -> Option<BoundingBox> {
    Some(BoundingBox {
        x: left.parse().ok()?,
        y: top.parse().ok()?,
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}
