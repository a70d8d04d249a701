//! Full-screen plane whose material tracks the latest shader text and uniforms.
//!
//! The plane keeps a two-slot holder with the newest [`ShaderText`] and the
//! newest [`UniformMap`]. Once both slots are filled, every new uniform map
//! (and every new shader text, which restarts the uniform stream) produces a
//! [`PlaneMesh`] whose fragment source starts with one `uniform` declaration
//! per uniform. Meshes go out through a [`Publisher`], so subscribers only see
//! meshes built after they subscribed; call
//! [`recompute`](ReactiveShaderPlane::recompute) to rebuild for them.
use std::sync::Arc;

use shaderload::{LoadError, ShaderFuture, ShaderText};
use thiserror::Error;

use crate::aggregator::{UniformAggregator, UniformMap, UniformStream};
use crate::signal::{Publisher, Subscription};
use crate::types::UniformKind;

#[derive(Debug, Error)]
pub enum PlaneError {
    #[error("uniform '{name}' has kind {kind} which has no GLSL type")]
    UnknownUniformKind { name: String, kind: UniformKind },
    #[error("failed to load shader text: {0}")]
    Load(#[from] LoadError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    pub width: f32,
    pub height: f32,
}

impl Default for PlaneGeometry {
    fn default() -> Self {
        Self {
            width: 2.0,
            height: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneMaterial {
    pub fragment_source: String,
    pub vertex_source: String,
    pub uniforms: UniformMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneMesh {
    pub geometry: PlaneGeometry,
    pub material: PlaneMaterial,
    /// Increments with every mesh the plane builds.
    pub generation: u64,
}

/// GLSL type used in the declaration header for `kind`.
pub fn glsl_type(name: &str, kind: &UniformKind) -> Result<&'static str, PlaneError> {
    match kind {
        UniformKind::Scalar => Ok("float"),
        UniformKind::Vector2 => Ok("vec2"),
        UniformKind::Vector3 => Ok("vec3"),
        UniformKind::Vector4 => Ok("vec4"),
        UniformKind::Texture => Ok("sampler2D"),
        UniformKind::Unmapped(_) => Err(PlaneError::UnknownUniformKind {
            name: name.to_string(),
            kind: kind.clone(),
        }),
    }
}

/// Prepends a declaration for every uniform to the fragment source.
pub fn compose(text: &ShaderText, uniforms: &UniformMap) -> Result<String, PlaneError> {
    let mut header = String::new();
    for descriptor in uniforms.iter() {
        let ty = glsl_type(&descriptor.name, &descriptor.kind())?;
        header.push_str("uniform ");
        header.push_str(ty);
        header.push(' ');
        header.push_str(&descriptor.name);
        header.push_str(";\n");
    }
    header.push_str(text.fragment_source());
    Ok(header)
}

#[derive(Debug, Default)]
struct LatestPair {
    shader: Option<ShaderText>,
    uniforms: Option<UniformMap>,
}

impl LatestPair {
    fn both(&self) -> Option<(&ShaderText, &UniformMap)> {
        Some((self.shader.as_ref()?, self.uniforms.as_ref()?))
    }
}

pub struct ReactiveShaderPlane {
    aggregator: UniformAggregator,
    stream: Option<UniformStream>,
    latest: LatestPair,
    pending: Option<ShaderFuture>,
    meshes: Publisher<Arc<PlaneMesh>>,
    geometry: PlaneGeometry,
    generation: u64,
}

impl ReactiveShaderPlane {
    pub fn new(aggregator: UniformAggregator) -> Self {
        Self {
            aggregator,
            stream: None,
            latest: LatestPair::default(),
            pending: None,
            meshes: Publisher::new(),
            geometry: PlaneGeometry::default(),
            generation: 0,
        }
    }

    pub fn subscribe(&self) -> Subscription<Arc<PlaneMesh>> {
        self.meshes.subscribe()
    }

    /// Restarts the uniform stream; the next [`pump`](Self::pump) folds the
    /// providers' current values and rebuilds the mesh.
    pub fn recompute(&mut self) {
        self.stream = Some(self.aggregator.current_uniforms());
    }

    /// Installs new shader text and restarts the uniform stream.
    pub fn on_shader_text(&mut self, text: ShaderText) {
        tracing::debug!(
            fragment_bytes = text.fragment_source().len(),
            "plane received shader text"
        );
        self.latest.shader = Some(text);
        self.recompute();
    }

    /// Waits on `future` from subsequent pumps.
    pub fn load(&mut self, future: ShaderFuture) {
        self.pending = Some(future);
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn shader(&self) -> Option<&ShaderText> {
        self.latest.shader.as_ref()
    }

    /// Polls the pending load, folds queued uniform updates and publishes a
    /// mesh for each. Returns the number of meshes published.
    pub fn pump(&mut self) -> Result<usize, PlaneError> {
        if let Some(future) = self.pending.as_mut() {
            match future.poll() {
                Ok(Some(text)) => {
                    self.pending = None;
                    self.on_shader_text(text);
                }
                Ok(None) => {}
                Err(err) => {
                    self.pending = None;
                    return Err(PlaneError::Load(err));
                }
            }
        }

        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        let maps: Vec<UniformMap> = stream.pending().collect();

        let mut published = 0;
        for map in maps {
            self.latest.uniforms = Some(map);
            if let Some((text, uniforms)) = self.latest.both() {
                let fragment_source = compose(text, uniforms)?;
                let mesh = PlaneMesh {
                    geometry: self.geometry,
                    material: PlaneMaterial {
                        fragment_source,
                        vertex_source: text.vertex_source().to_string(),
                        uniforms: uniforms.clone(),
                    },
                    generation: self.generation,
                };
                self.generation += 1;
                self.meshes.publish(Arc::new(mesh));
                published += 1;
            }
        }

        if published > 0 {
            tracing::trace!(published, generation = self.generation, "plane meshes published");
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PropertyProvider;
    use crate::providers::{ConstantProvider, ResolutionProvider, TimeProvider};
    use crate::types::{UniformDescriptor, UniformValue};

    fn plane_with(providers: Vec<Arc<dyn PropertyProvider>>) -> ReactiveShaderPlane {
        ReactiveShaderPlane::new(UniformAggregator::new(providers))
    }

    fn text() -> ShaderText {
        ShaderText::new("void main() {}", "// vertex")
    }

    #[test]
    fn compose_prepends_declarations() {
        let uniforms: UniformMap = [
            UniformDescriptor::scalar("time", 0.0),
            UniformDescriptor::vector2("resolution", [1.0, 1.0]),
            UniformDescriptor::vector3("tint", [0.0; 3]),
            UniformDescriptor::vector4("mouse", [0.0; 4]),
        ]
        .into_iter()
        .collect();

        let source = compose(&text(), &uniforms).unwrap();
        assert_eq!(
            source,
            "uniform vec4 mouse;\nuniform vec2 resolution;\nuniform float time;\nuniform vec3 tint;\nvoid main() {}"
        );
    }

    #[test]
    fn unmapped_kind_is_an_error() {
        let uniforms: UniformMap = [UniformDescriptor::new(
            "weights",
            UniformValue::Other {
                tag: "m4".into(),
                components: vec![0.0; 16],
            },
        )]
        .into_iter()
        .collect();

        let err = compose(&text(), &uniforms).unwrap_err();
        assert!(matches!(err, PlaneError::UnknownUniformKind { ref name, .. } if name == "weights"));
    }

    #[test]
    fn publishes_mesh_once_shader_and_uniforms_exist() {
        let time = Arc::new(TimeProvider::new());
        let mut plane = plane_with(vec![
            Arc::new(ResolutionProvider::new(800, 600)) as Arc<dyn PropertyProvider>,
            time.clone() as Arc<dyn PropertyProvider>,
        ]);
        let meshes = plane.subscribe();

        assert_eq!(plane.pump().unwrap(), 0);
        plane.on_shader_text(text());
        assert_eq!(plane.pump().unwrap(), 1);

        let published = meshes.drain();
        assert_eq!(published.len(), 1);
        let mesh = Arc::clone(&published[0]);
        assert_eq!(mesh.geometry, PlaneGeometry { width: 2.0, height: 2.0 });
        assert!(mesh.material.fragment_source.contains("uniform float time;"));
        assert!(mesh.material.fragment_source.contains("uniform vec2 resolution;"));
        assert_eq!(mesh.material.vertex_source, "// vertex");

        time.set_seconds(2.0);
        assert_eq!(plane.pump().unwrap(), 1);
        let next = meshes.latest().unwrap();
        assert!(next.generation > mesh.generation);
        assert_eq!(next.material.uniforms.get("time").unwrap().as_scalar(), Some(2.0));
    }

    #[test]
    fn every_kick_publishes_one_complete_header() {
        let mut plane = plane_with(vec![
            Arc::new(TimeProvider::new()) as Arc<dyn PropertyProvider>,
            Arc::new(ResolutionProvider::new(800, 600)) as Arc<dyn PropertyProvider>,
        ]);
        let meshes = plane.subscribe();
        plane.on_shader_text(ShaderText::new(
            "void main() { gl_FragColor = vec4(time / resolution.x); }",
            "// vertex",
        ));
        plane.pump().unwrap();
        plane.recompute();
        plane.pump().unwrap();

        let published = meshes.drain();
        assert_eq!(published.len(), 2);
        for mesh in published {
            assert!(mesh
                .material
                .fragment_source
                .starts_with("uniform vec2 resolution;\nuniform float time;\n"));
        }
    }

    #[test]
    fn new_subscribers_wait_for_a_kick() {
        let mut plane = plane_with(vec![Arc::new(ConstantProvider::new(
            "constant",
            vec![UniformDescriptor::scalar("level", 1.0)],
        )) as Arc<dyn PropertyProvider>]);
        plane.on_shader_text(text());
        let first = plane.subscribe();
        plane.pump().unwrap();
        assert!(first.latest().is_some());

        let second = plane.subscribe();
        assert_eq!(plane.pump().unwrap(), 0);
        assert!(second.try_next().is_none());

        plane.recompute();
        assert_eq!(plane.pump().unwrap(), 1);
        assert!(second.try_next().is_some());
    }

    #[test]
    fn pending_load_feeds_the_plane() {
        let mut plane = plane_with(vec![
            Arc::new(TimeProvider::new()) as Arc<dyn PropertyProvider>
        ]);
        let meshes = plane.subscribe();
        let (promise, future) = ShaderFuture::pending();
        plane.load(future);

        assert_eq!(plane.pump().unwrap(), 0);
        assert!(plane.is_loading());

        promise.resolve(Ok(text()));
        assert_eq!(plane.pump().unwrap(), 1);
        assert!(!plane.is_loading());
        assert!(meshes.latest().is_some());
    }

    #[test]
    fn load_failure_reaches_the_caller() {
        let mut plane = plane_with(Vec::new());
        let (promise, future) = ShaderFuture::pending();
        plane.load(future);
        promise.resolve(Err(LoadError::InvalidProgram("x".into())));

        assert!(matches!(plane.pump(), Err(PlaneError::Load(_))));
        assert!(!plane.is_loading());
    }
}
