use serde::Serialize;

use super::classify::{TokenCategory, TokenClassifier};
use crate::models::{ApplianceType, OccupancyStatus};
use crate::pipeline::recognition::RecognizedDocument;

/// The four per-category token sequences, each in recognition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedTokens {
    pub types: Vec<ApplianceType>,
    pub statuses: Vec<OccupancyStatus>,
    pub external_ids: Vec<String>,
    pub times: Vec<String>,
}

impl ClassifiedTokens {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.statuses.is_empty()
            && self.external_ids.is_empty()
            && self.times.is_empty()
    }
}

/// Flatten a recognition result (page, block, line, word) and partition it.
pub fn scan_document(doc: &RecognizedDocument, classifier: &TokenClassifier) -> ClassifiedTokens {
    scan_values(doc.words().map(|w| w.value.as_str()), classifier)
}

/// Partition an already flattened word stream. Unclassified words are dropped.
pub fn scan_values<'a, I>(values: I, classifier: &TokenClassifier) -> ClassifiedTokens
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = ClassifiedTokens::default();

    for value in values {
        match classifier.classify(value) {
            TokenCategory::ApplianceType(kind) => out.types.push(kind),
            TokenCategory::OccupancyStatus(status) => out.statuses.push(status),
            TokenCategory::ExternalId => out.external_ids.push(value.to_string()),
            TokenCategory::ElapsedTime => out.times.push(value.to_string()),
            TokenCategory::Unclassified => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tokens::{Vocabulary, VocabularyConfig};

    fn classifier() -> TokenClassifier {
        TokenClassifier::new(Vocabulary::from_config(&VocabularyConfig::default()).unwrap())
    }

    #[test]
    fn partitions_preserving_order() {
        let tokens = scan_values(
            [
                "Waschmaschine", "12345", "belegt", "01:02:03", "Raum", "Trockner", "23456", "frei",
            ],
            &classifier(),
        );
        assert_eq!(
            tokens.types,
            vec![ApplianceType::WashingMachine, ApplianceType::Dryer]
        );
        assert_eq!(
            tokens.statuses,
            vec![OccupancyStatus::Occupied, OccupancyStatus::Free]
        );
        assert_eq!(tokens.external_ids, vec!["12345", "23456"]);
        assert_eq!(tokens.times, vec!["01:02:03"]);
    }

    #[test]
    fn scans_nested_document_in_traversal_order() {
        let doc = RecognizedDocument::from_lines(&[
            &["Trockner", "11111"],
            &["Laufzeit:", "0:30:00"],
            &["Trockner", "22222", "frei"],
        ]);
        let tokens = scan_document(&doc, &classifier());
        assert_eq!(tokens.external_ids, vec!["11111", "22222"]);
        assert_eq!(
            tokens.statuses,
            vec![OccupancyStatus::RunningPrefix, OccupancyStatus::Free]
        );
        assert_eq!(tokens.times, vec!["0:30:00"]);
    }

    #[test]
    fn unrecognized_stream_is_empty() {
        let tokens = scan_values(["Guten", "Tag"], &classifier());
        assert!(tokens.is_empty());
    }
}
