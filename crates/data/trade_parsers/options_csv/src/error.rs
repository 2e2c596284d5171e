use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The mapping could not find every required column.
    #[error("preset \"{preset}\"{}: missing columns: {}", detected_suffix(.detected), .missing.join(", "))]
    MissingColumns {
        preset: String,
        detected: Option<String>,
        missing: Vec<String>,
    },

    #[error("unknown preset '{0}' (expected auto, ibkr, tos, tasty, tradestation, tradier, tradier_activity or tradier_statement)")]
    UnknownPreset(String),

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),
}

fn detected_suffix(detected: &Option<String>) -> String {
    match detected {
        Some(d) => format!(" (detected {})", d),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_fields() {
        let err = ImportError::MissingColumns {
            preset: "auto".to_string(),
            detected: Some("ibkr".to_string()),
            missing: vec!["contracts".to_string(), "premium".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "preset \"auto\" (detected ibkr): missing columns: contracts, premium"
        );
    }
}
