pub type RenderResult<T> = Result<T, RenderError>;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_prefix_is_stable() {
        let err = RenderError::validation("width 0 out of range");
        assert!(err.to_string().starts_with("validation error:"));
        assert!(err.is_validation());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = RenderError::from(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_validation());
    }
}
