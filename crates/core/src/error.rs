use crate::engine::EngineError;

/// Errors surfaced by the editing core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no document loaded")]
    NoDocumentLoaded,
    #[error("page {page} out of range (page_count={page_count})")]
    InvalidRegion { page: u16, page_count: u16 },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("selection is empty")]
    EmptySelection,
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(CoreError::NoDocumentLoaded.to_string(), "no document loaded");
        assert_eq!(
            CoreError::InvalidRegion { page: 4, page_count: 2 }.to_string(),
            "page 4 out of range (page_count=2)"
        );
        assert_eq!(
            CoreError::MalformedInput("font size \"x\"".to_string()).to_string(),
            "malformed input: font size \"x\""
        );
    }

    #[test]
    fn test_engine_errors_convert() {
        let err: CoreError = EngineError::Save("disk full".to_string()).into();
        assert!(matches!(err, CoreError::Engine(_)));
        assert_eq!(err.to_string(), "failed to save document: disk full");
    }
}
