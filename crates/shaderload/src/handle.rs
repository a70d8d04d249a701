use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::LoadError;

/// Where program sources live: a remote base URL or a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(Url),
    Directory(PathBuf),
}

impl SourceLocation {
    /// Interprets `http://` and `https://` inputs as remote bases and anything
    /// else as a directory path.
    pub fn parse(input: &str) -> Result<Self, LoadError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LoadError::InvalidLocation(input.to_string()));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            // Url::join drops the last segment unless the base ends with '/'.
            let normalized = if trimmed.ends_with('/') {
                trimmed.to_string()
            } else {
                format!("{trimmed}/")
            };
            let url = Url::parse(&normalized)
                .map_err(|_| LoadError::InvalidLocation(input.to_string()))?;
            return Ok(Self::Remote(url));
        }

        Ok(Self::Directory(PathBuf::from(trimmed)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn directory(&self) -> Option<&Path> {
        match self {
            Self::Directory(path) => Some(path.as_path()),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Directory(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_base_with_trailing_slash() {
        let location = SourceLocation::parse("https://example.com/shaders").unwrap();
        match location {
            SourceLocation::Remote(url) => assert_eq!(url.as_str(), "https://example.com/shaders/"),
            other => panic!("expected remote location, got {other:?}"),
        }
    }

    #[test]
    fn parses_local_directory() {
        assert!(matches!(
            SourceLocation::parse("assets/shaders"),
            Ok(SourceLocation::Directory(path)) if path == PathBuf::from("assets/shaders")
        ));
    }

    #[test]
    fn rejects_empty_location() {
        assert!(SourceLocation::parse("  ").is_err());
    }
}
