use thiserror::Error;

/// Fatal errors. Bad data inside a source table is never one of these: it is
/// reported as [`crate::model::InvalidRecord`] rows and the run continues.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (negative tolerance, bad subset size, empty keyword, ...).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// CSV decoding error while reading raw rows.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed_by_kind() {
        let err = ReconError::ConfigValidation("tolerance.amount_cents must be >= 0".into());
        assert_eq!(
            err.to_string(),
            "config validation error: tolerance.amount_cents must be >= 0"
        );
    }
}
