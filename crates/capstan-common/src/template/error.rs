//! Template error types

use std::fmt;

/// Errors that can occur during template operations
#[derive(Debug)]
pub enum TemplateError {
    /// Template compilation or rendering failed
    Render(minijinja::Error),
    /// No template with this name exists
    NotFound(String),
    /// Template directory does not exist
    Directory(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(e) => write!(f, "template render error: {}", e),
            Self::NotFound(name) => write!(f, "template not found: {}", name),
            Self::Directory(dir) => write!(f, "template directory not found: {}", dir),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(e) => Some(e),
            _ => None,
        }
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        Self::Render(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = TemplateError::NotFound("values.yaml.j2".to_string());
        assert_eq!(err.to_string(), "template not found: values.yaml.j2");
    }

    #[test]
    fn test_render_error_has_source() {
        use std::error::Error as _;
        let inner = minijinja::Error::new(minijinja::ErrorKind::UndefinedError, "x is undefined");
        let err = TemplateError::from(inner);
        assert!(err.to_string().starts_with("template render error"));
        assert!(err.source().is_some());
    }
}
