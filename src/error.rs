use thiserror::Error;

/// Errors surfaced by codecs, the optimization engine and the service
/// layer. All are terminal for the operation that raised them; nothing is
/// retried internally.
#[derive(Error, Debug)]
pub enum TrackError {
    /// Bytes do not parse as the claimed format.
    #[error("malformed {format} input: {reason}")]
    MalformedInput { format: &'static str, reason: String },

    /// Format/geometry combination that is not implemented.
    #[error("unsupported: {0}")]
    UnsupportedFormat(String),

    /// An export requires fields the container lacks.
    #[error("missing required data: {0}")]
    MissingRequiredData(&'static str),

    /// A referenced track or point identifier is absent from storage.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML writer plumbing failure; decode paths report `MalformedInput`
    /// with the format name instead.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl TrackError {
    pub fn malformed(format: &'static str, reason: impl ToString) -> Self {
        Self::MalformedInput {
            format,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackError>;
