use thiserror::Error;

/// Top-level error type for the `firebridge` crate.
///
/// Covers every failure mode across the adapter: pre-flight rejections,
/// transport failures, structured backend errors, and responses missing
/// fields the wire contract promises.
#[derive(Debug, Error)]
pub enum Error {
    // ── Pre-flight rejections ───────────────────────────────────────
    /// The backend cannot express the requested rule at all (DENY
    /// permission, non-global destination, egress outside a VLAN).
    /// Never retried and never sent over the wire.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Mutation against a firewall the backend does not know.
    #[error("No such firewall: {0}")]
    NotFound(String),

    /// No active region in the provider context; listing and describe
    /// calls cannot be routed without one.
    #[error("No region has been established for this request")]
    NoRegion,

    // ── Backend ─────────────────────────────────────────────────────
    /// Structured error reported by the backend and not special-cased.
    #[error("Backend rejected the request ({}): {message}", code.as_deref().unwrap_or("no code"))]
    Backend {
        code: Option<String>,
        message: String,
    },

    /// An otherwise successful response was missing an expected field
    /// (assigned group id, boolean `return` flag).
    #[error("Failed to {action} without explanation from the backend")]
    MalformedResponse { action: &'static str },

    // ── Name allocation ─────────────────────────────────────────────
    /// The allocator ran through every base extension without finding a
    /// free name. Treated as a systemic listing problem, not genuine
    /// namespace exhaustion.
    #[error("Could not generate a unique firewall name from {base}")]
    NameExhausted { base: String },

    /// A composite rule id did not round-trip back into its fields.
    #[error("Unable to parse rule id: {0}")]
    InvalidRuleId(String),

    // ── Transport / decode boundaries ───────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body was not a well-formed XML document.
    #[error("Unparseable response document: {0}")]
    Document(#[from] firebridge_xml::ParseError),
}

impl Error {
    /// Backend code for a rule that already exists. Authorize treats this
    /// as success (the rule id is derivable without the backend's help).
    pub fn is_duplicate_rule(&self) -> bool {
        matches!(self, Self::Backend { code: Some(c), .. } if c == "InvalidPermission.Duplicate")
    }

    /// Backend codes in the `InvalidGroup` family. Reads convert these
    /// into empty results: a deleted firewall legitimately has no rules.
    pub fn is_invalid_group(&self) -> bool {
        matches!(self, Self::Backend { code: Some(c), .. } if c.starts_with("InvalidGroup"))
    }

    /// Extract the backend error code, if this is a backend error.
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    fn backend(code: &str) -> Error {
        Error::Backend {
            code: Some(code.to_string()),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn duplicate_rule_code_is_recognized() {
        assert!(backend("InvalidPermission.Duplicate").is_duplicate_rule());
        assert!(!backend("InvalidPermission.Malformed").is_duplicate_rule());
        assert!(!Error::NoRegion.is_duplicate_rule());
    }

    #[test]
    fn invalid_group_matches_on_prefix() {
        assert!(backend("InvalidGroup.NotFound").is_invalid_group());
        assert!(backend("InvalidGroupId.Malformed").is_invalid_group());
        assert!(!backend("InvalidParameterValue").is_invalid_group());
    }

    #[test]
    fn codeless_backend_error_matches_nothing() {
        let err = Error::Backend {
            code: None,
            message: "opaque".to_string(),
        };
        assert!(!err.is_duplicate_rule());
        assert!(!err.is_invalid_group());
        assert_eq!(err.backend_code(), None);
    }
}
