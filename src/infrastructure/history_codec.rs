use crate::domain::calendar::DateKey;
use crate::domain::models::DaySnapshot;
use crate::infrastructure::day_store::DayStore;
use crate::infrastructure::error::InfraError;
use std::collections::BTreeMap;

/// Result of decoding a whole-history document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedHistory {
    pub entries: Vec<(DateKey, DaySnapshot)>,
    pub skipped: usize,
}

/// The full history as one JSON object keyed by ISO date, in date order.
pub fn export_history(store: &dyn DayStore) -> Result<String, InfraError> {
    let mut history = serde_json::Map::new();
    for key in store.keys()? {
        match store.get(&key) {
            Ok(Some(snapshot)) => {
                history.insert(key.to_string(), serde_json::to_value(&snapshot)?);
            }
            Ok(None) => {}
            Err(InfraError::Json(error)) => {
                tracing::warn!(date = %key, %error, "leaving malformed snapshot out of export");
            }
            Err(error) => return Err(error),
        }
    }
    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(history))?)
}

/// Decodes a history document. Anything that is not a JSON object counts as
/// an empty history; entries whose key or block list cannot be understood
/// are skipped. Legacy date keys are normalized, and when two keys name the
/// same day the canonical one wins.
pub fn parse_history(raw: &str) -> ParsedHistory {
    let document = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(document)) => document,
        Ok(_) => {
            tracing::warn!("history document is not an object, treating as empty");
            return ParsedHistory::default();
        }
        Err(error) => {
            tracing::warn!(%error, "history document is malformed, treating as empty");
            return ParsedHistory::default();
        }
    };

    let mut skipped = 0;
    let mut decoded: BTreeMap<DateKey, (bool, DaySnapshot)> = BTreeMap::new();
    for (raw_key, value) in document {
        let Some(key) = DateKey::parse_lenient(&raw_key) else {
            tracing::warn!(key = raw_key.as_str(), "skipping history entry with unknown date key");
            skipped += 1;
            continue;
        };
        let snapshot = match serde_json::from_value::<DaySnapshot>(value) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(date = %key, %error, "skipping undecodable history entry");
                skipped += 1;
                continue;
            }
        };
        if let Err(error) = snapshot.validate() {
            tracing::warn!(date = %key, error = error.as_str(), "skipping invalid history entry");
            skipped += 1;
            continue;
        }

        let canonical = DateKey::parse(&raw_key).is_ok();
        match decoded.get(&key).map(|(existing_canonical, _)| *existing_canonical) {
            Some(existing_canonical) if existing_canonical || !canonical => {
                skipped += 1;
            }
            Some(_) => {
                skipped += 1;
                decoded.insert(key, (canonical, snapshot));
            }
            None => {
                decoded.insert(key, (canonical, snapshot));
            }
        }
    }

    ParsedHistory {
        entries: decoded
            .into_iter()
            .map(|(key, (_, snapshot))| (key, snapshot))
            .collect(),
        skipped,
    }
}
