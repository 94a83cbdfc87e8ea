//! Classified token sequences → appliance records.
//!
//! Types, statuses and identifiers are zipped by position. The display lists
//! each appliance's fields as one contiguous run, so the i-th type, status and
//! identifier belong together. Elapsed times are only shown for running
//! machines and are handed out in order through an explicit cursor.

use crate::models::ApplianceRecord;
use crate::pipeline::tokens::ClassifiedTokens;

/// Build records from classified tokens.
///
/// Returns an empty list when the type, status and identifier sequences
/// differ in length: the recognition is treated as corrupted and no partial
/// result is produced.
pub fn assemble(tokens: &ClassifiedTokens) -> Vec<ApplianceRecord> {
    let count = tokens.types.len();
    if tokens.statuses.len() != count || tokens.external_ids.len() != count {
        tracing::debug!(
            types = count,
            statuses = tokens.statuses.len(),
            external_ids = tokens.external_ids.len(),
            "Token sequences differ in length, discarding image"
        );
        return Vec::new();
    }

    let (records, consumed) = tokens
        .types
        .iter()
        .zip(&tokens.statuses)
        .zip(&tokens.external_ids)
        .fold(
            (Vec::with_capacity(count), 0usize),
            |(mut records, cursor), ((kind, status), id)| {
                let (running_for, cursor) = if status.is_in_use() {
                    (tokens.times.get(cursor).cloned(), cursor + 1)
                } else {
                    (None, cursor)
                };

                records.push(ApplianceRecord {
                    appliance_type: *kind,
                    status: *status,
                    external_id: id.clone(),
                    running_for,
                });
                (records, cursor)
            },
        );

    if consumed > tokens.times.len() {
        tracing::debug!(
            needed = consumed,
            available = tokens.times.len(),
            "Fewer elapsed times than running appliances"
        );
    } else if consumed < tokens.times.len() {
        tracing::debug!(
            used = consumed,
            available = tokens.times.len(),
            "Unused elapsed times left over"
        );
    }

    records
}
