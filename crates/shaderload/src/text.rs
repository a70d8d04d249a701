use std::sync::Arc;

/// Assembled, immutable shader sources for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderText {
    fragment_source: Arc<str>,
    vertex_source: Arc<str>,
}

impl ShaderText {
    pub fn new(fragment_source: impl Into<Arc<str>>, vertex_source: impl Into<Arc<str>>) -> Self {
        Self {
            fragment_source: fragment_source.into(),
            vertex_source: vertex_source.into(),
        }
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }
}
