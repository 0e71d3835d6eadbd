use std::fs;
use std::path::{Path, PathBuf};

use models::Deal;
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Anything that can hand the engine a list of raw deals.
pub trait DealSource {
    fn load_deals(&self) -> Result<Vec<Deal>>;
}

/// Reads deals from a JSON file holding an array of records.
pub struct FileDealSource {
    path: PathBuf,
}

impl FileDealSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DealSource for FileDealSource {
    fn load_deals(&self) -> Result<Vec<Deal>> {
        let raw = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&raw)?;
        let deals = deals_from_json(value)?;
        tracing::info!(path = %self.path.display(), deals = deals.len(), "deals loaded");
        Ok(deals)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turns a decoded payload into deals.
///
/// The payload must be an array. Elements that are not deal-shaped objects
/// are skipped with a warning.
pub fn deals_from_json(value: Value) -> Result<Vec<Deal>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(EngineError::InvalidInput(format!(
                "expected an array of deals, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut deals = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            tracing::warn!(position, kind = json_kind(&item), "skipping non-object deal");
            continue;
        }
        match serde_json::from_value::<Deal>(item) {
            Ok(deal) => deals.push(deal),
            Err(e) => tracing::warn!(position, error = %e, "skipping malformed deal"),
        }
    }
    Ok(deals)
}
