use thiserror::Error;

/// Failures raised while fetching or assembling shader text.
///
/// Missing vertex sources never surface here; the loader absorbs them by
/// substituting the default plane vertex program.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("fragment source for '{program}' not found at {location}")]
    FragmentMissing { program: String, location: String },

    #[error("shared fragment '{name}' not found at {location}")]
    SharedFragmentMissing { name: String, location: String },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid shader source location '{0}'")]
    InvalidLocation(String),

    #[error("invalid program name '{0}'")]
    InvalidProgram(String),

    #[error("shader load worker disconnected before returning a result")]
    WorkerDisconnected,
}
