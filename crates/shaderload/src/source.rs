//! Raw text fetchers behind [`ShaderTextLoader`](crate::ShaderTextLoader).
//!
//! Types:
//!
//! - `ShaderSource` is the seam the loader fetches through. `Ok(None)` means
//!   the file does not exist (HTTP 404, missing file) and lets the loader pick
//!   between fallback and failure; `Err` is reserved for transport problems.
//! - `HttpSource` issues blocking `GET <base>/<file>` requests.
//! - `DirectorySource` reads `<root>/<file>` from disk.
//!
//! Functions:
//!
//! - `open_source` builds the matching source for a [`SourceLocation`].
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::{LoadError, SourceLocation};

pub trait ShaderSource: Send + Sync + fmt::Debug {
    /// Fetches `file` (e.g. `flocking/texture.frag`) relative to the source root.
    fn fetch(&self, file: &str) -> Result<Option<String>, LoadError>;

    /// Human-readable location of `file`, used in error messages.
    fn describe(&self, file: &str) -> String;
}

pub fn open_source(location: &SourceLocation) -> Result<Arc<dyn ShaderSource>, LoadError> {
    match location {
        SourceLocation::Remote(url) => Ok(Arc::new(HttpSource::new(url.clone())?)),
        SourceLocation::Directory(path) => Ok(Arc::new(DirectorySource::new(path.clone()))),
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    http: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url) -> Result<Self, LoadError> {
        let http = Client::builder().build().map_err(|err| LoadError::Http {
            url: base.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self { http, base })
    }

    fn resolve(&self, file: &str) -> Result<Url, LoadError> {
        validate_relative(file)?;
        self.base
            .join(file)
            .map_err(|_| LoadError::InvalidProgram(file.to_string()))
    }
}

impl ShaderSource for HttpSource {
    fn fetch(&self, file: &str) -> Result<Option<String>, LoadError> {
        let url = self.resolve(file)?;
        debug!(%url, "fetching shader source");
        let http_error = |err: reqwest::Error| LoadError::Http {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = self.http.get(url.clone()).send().map_err(http_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(http_error)?;
        let body = response.text().map_err(http_error)?;
        Ok(Some(body))
    }

    fn describe(&self, file: &str) -> String {
        self.resolve(file)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}{file}", self.base))
    }
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ShaderSource for DirectorySource {
    fn fetch(&self, file: &str) -> Result<Option<String>, LoadError> {
        validate_relative(file)?;
        let path = self.root.join(file);
        debug!(path = %path.display(), "reading shader source");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(LoadError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }

    fn describe(&self, file: &str) -> String {
        self.root.join(file).display().to_string()
    }
}

/// Program files must stay below the source root.
fn validate_relative(file: &str) -> Result<(), LoadError> {
    let path = Path::new(file);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if file.is_empty() || escapes {
        return Err(LoadError::InvalidProgram(file.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_source_reports_missing_files_as_none() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("demo.frag"), "void main() {}").unwrap();

        let source = DirectorySource::new(temp.path());
        assert_eq!(
            source.fetch("demo.frag").unwrap().as_deref(),
            Some("void main() {}")
        );
        assert_eq!(source.fetch("demo.vert").unwrap(), None);
    }

    #[test]
    fn rejects_paths_escaping_the_root() {
        let source = DirectorySource::new("shaders");
        assert!(matches!(
            source.fetch("../secret.frag"),
            Err(LoadError::InvalidProgram(_))
        ));
        assert!(matches!(
            source.fetch("/etc/passwd"),
            Err(LoadError::InvalidProgram(_))
        ));
    }

    /// Answers one request on a local port with a canned status and body.
    fn serve_once(status: &'static str, body: &'static str) -> Url {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
        });
        Url::parse(&format!("http://{addr}/shaders/")).unwrap()
    }

    #[test]
    fn http_source_maps_not_found_to_none() {
        let source = HttpSource::new(serve_once("404 Not Found", "missing")).unwrap();
        assert_eq!(source.fetch("demo.vert").unwrap(), None);
    }

    #[test]
    fn http_source_returns_body_on_success() {
        let source = HttpSource::new(serve_once("200 OK", "void main() {}")).unwrap();
        assert_eq!(
            source.fetch("demo.frag").unwrap().as_deref(),
            Some("void main() {}")
        );
    }

    #[test]
    fn http_source_surfaces_server_errors() {
        let source = HttpSource::new(serve_once("500 Internal Server Error", "boom")).unwrap();
        assert!(matches!(
            source.fetch("demo.frag"),
            Err(LoadError::Http { .. })
        ));
    }

    #[test]
    fn http_source_joins_nested_programs() {
        let base = Url::parse("https://example.com/shaders/").unwrap();
        let source = HttpSource::new(base).unwrap();
        assert_eq!(
            source.describe("flocking/texture.frag"),
            "https://example.com/shaders/flocking/texture.frag"
        );
    }
}
