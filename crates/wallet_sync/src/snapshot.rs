//! Lenient decoding of a pulled wallet document.
//!
//! A record that does not parse is logged and dropped; the rest of the
//! document still merges.

use api_types::wallet::{EntityKind, Snapshot};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::SyncError;

#[derive(Debug, Default)]
pub struct Decoded {
    pub snapshot: Snapshot,
    /// Records dropped because they did not parse.
    pub skipped: usize,
}

pub fn decode(document: Value) -> Result<Decoded, SyncError> {
    let Value::Object(mut document) = document else {
        return Err(SyncError::Remote(
            "wallet document is not a JSON object".to_string(),
        ));
    };

    let mut skipped = 0;
    let snapshot = Snapshot {
        accounts: collection(&mut document, EntityKind::Account, &mut skipped),
        transactions: collection(&mut document, EntityKind::Transaction, &mut skipped),
        recurring: collection(&mut document, EntityKind::RecurringRule, &mut skipped),
        credit_cards: collection(&mut document, EntityKind::CreditCard, &mut skipped),
        cc_transactions: collection(&mut document, EntityKind::CcTransaction, &mut skipped),
        created_at: stamp(&document, "createdAt"),
        updated_at: stamp(&document, "updatedAt"),
    };
    Ok(Decoded { snapshot, skipped })
}

fn collection<T: DeserializeOwned>(
    document: &mut Map<String, Value>,
    kind: EntityKind,
    skipped: &mut usize,
) -> Vec<T> {
    let key = kind.collection();
    let items = match document.remove(key) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => {
            tracing::debug!(collection = key, "collection missing from wallet document");
            return Vec::new();
        }
        Some(_) => {
            tracing::warn!(collection = key, "collection is not an array, ignoring it");
            *skipped += 1;
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(collection = key, index, "skipping malformed record: {err}");
                *skipped += 1;
                None
            }
        })
        .collect()
}

fn stamp(document: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    document
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
}
