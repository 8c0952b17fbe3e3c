//! Config validation: unknown-key detection with "did you mean?" suggestions.
//!
//! The raw TOML is parsed into a `toml::Value` first and every dotted key path
//! is compared against the known schema. Unknown keys only produce warnings;
//! serde then deserializes the file as usual.

/// A non-fatal config warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

/// Every valid dotted key path of `AppConfig`.
///
/// Must be kept in step with the structs in `app_config.rs`.
pub const KNOWN_CONFIG_KEYS: &[&str] = &[
    "ingest",
    "ingest.chunk_size",
    "ingest.numeric_policy",
    "trend",
    "trend.window_hours",
    "trend.slot_minutes",
];

/// Maximum edit distance for a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Collect dotted key paths of all tables and values under `value`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };

    table
        .iter()
        .flat_map(|(k, v)| {
            let path = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
            let nested = walk_toml_keys(v, &path);
            std::iter::once(path).chain(nested)
        })
        .collect()
}

/// Levenshtein edit distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr.push(substitution.min(prev[j + 1] + 1).min(curr[j] + 1));
        }
        prev = curr;
    }

    prev[b.len()]
}

/// Closest known key within [`MAX_SUGGESTION_DISTANCE`] edits.
pub fn suggest_correction(unknown: &str) -> Option<String> {
    KNOWN_CONFIG_KEYS
        .iter()
        .map(|known| (*known, levenshtein(unknown, known)))
        .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(known, _)| known.to_string())
}

/// Warnings for every key in `raw_toml` that the config does not know.
///
/// Syntax errors are left for the serde pass to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !KNOWN_CONFIG_KEYS.contains(&key.as_str()))
        .map(|key| ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            suggestion: suggest_correction(&key),
            field: key,
        })
        .collect()
}
