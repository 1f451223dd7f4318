use thiserror::Error;

/// Why a provider document could not be turned into forecast points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A required field is missing or has the wrong type.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The document is valid but carries fewer slots than were asked for.
    #[error("insufficient data: provider returned {available} entries, {requested} requested")]
    InsufficientData { available: usize, requested: usize },
}

impl ParseError {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedResponse(what.into())
    }
}

/// Failure of one end-to-end forecast retrieval.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    /// Transport, HTTP status and body decoding failures.
    pub fn is_network(&self) -> bool {
        !matches!(self, FetchError::Parse(_))
    }

    /// Whether asking again could plausibly give a different answer.
    ///
    /// Nothing varies its behavior on this yet; every failure is retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Parse(ParseError::MalformedResponse(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy() {
        let status = FetchError::Status { status: 502, body: "bad gateway".into() };
        assert!(status.is_network());
        assert!(status.is_retryable());

        let malformed = FetchError::from(ParseError::malformed("city.name"));
        assert!(!malformed.is_network());
        assert!(!malformed.is_retryable());

        let short = FetchError::from(ParseError::InsufficientData { available: 2, requested: 4 });
        assert!(!short.is_network());
        assert!(short.is_retryable());
    }

    #[test]
    fn messages() {
        let err = ParseError::InsufficientData { available: 2, requested: 4 };
        assert_eq!(
            err.to_string(),
            "insufficient data: provider returned 2 entries, 4 requested"
        );
        assert_eq!(
            FetchError::from(ParseError::malformed("dt")).to_string(),
            "malformed response: dt"
        );
    }
}
