//! Assembles program text from a [`ShaderSource`].
//!
//! Types:
//!
//! - `LoaderConfig` names the shared fragments (`util`, `controls_init`) and
//!   the program whose vertex source stands in for programs without one.
//! - `ShaderTextLoader` memoizes the shared fragments on first use and hands
//!   out `ShaderFuture`s so callers never block their frame loop on I/O.
//! - `ShaderFuture` is either already resolved or waiting on a worker thread;
//!   `ShaderPromise` lets other producers resolve a future by hand.
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, warn};

use crate::source::{open_source, ShaderSource};
use crate::{LoadError, ShaderText, SourceLocation};

/// Vertex program used when neither the program nor the source provide one.
pub const DEFAULT_PLANE_VERTEX: &str = r"varying vec2 vUv;

void main() {
    vUv = uv;
    gl_Position = vec4(position, 1.0);
}
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub utility: String,
    pub initial_methods: String,
    pub default_vertex: String,
}

impl LoaderConfig {
    /// Layout used by visualizations that expose no UI controls.
    pub fn without_controls() -> Self {
        Self {
            initial_methods: "no_controls".to_string(),
            ..Self::default()
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            utility: "util".to_string(),
            initial_methods: "controls_init".to_string(),
            default_vertex: "plane".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShaderTextLoader {
    inner: Arc<LoaderInner>,
}

#[derive(Debug)]
struct LoaderInner {
    source: Arc<dyn ShaderSource>,
    config: LoaderConfig,
    utility: Mutex<Option<Arc<str>>>,
    initial_methods: Mutex<Option<Arc<str>>>,
    default_vertex: Mutex<Option<Arc<str>>>,
}

impl ShaderTextLoader {
    pub fn new(source: Arc<dyn ShaderSource>, config: LoaderConfig) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                source,
                config,
                utility: Mutex::new(None),
                initial_methods: Mutex::new(None),
                default_vertex: Mutex::new(None),
            }),
        }
    }

    pub fn from_location(location: &SourceLocation, config: LoaderConfig) -> Result<Self, LoadError> {
        Ok(Self::new(open_source(location)?, config))
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Starts loading `program` on a worker thread.
    pub fn load(&self, program: &str) -> ShaderFuture {
        self.load_varied(program, program)
    }

    /// Loads the fragment of `fragment_program` paired with the vertex source
    /// of `vertex_program`.
    pub fn load_varied(&self, fragment_program: &str, vertex_program: &str) -> ShaderFuture {
        let inner = Arc::clone(&self.inner);
        let fragment_program = fragment_program.to_string();
        let vertex_program = vertex_program.to_string();
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let result = inner.assemble(&fragment_program, &vertex_program);
            let _ = sender.send(result);
        });

        ShaderFuture::Threaded { receiver }
    }

    pub fn load_blocking(&self, program: &str) -> Result<ShaderText, LoadError> {
        self.inner.assemble(program, program)
    }

    pub fn load_varied_blocking(
        &self,
        fragment_program: &str,
        vertex_program: &str,
    ) -> Result<ShaderText, LoadError> {
        self.inner.assemble(fragment_program, vertex_program)
    }
}

impl LoaderInner {
    fn assemble(&self, fragment_program: &str, vertex_program: &str) -> Result<ShaderText, LoadError> {
        let utility = self.shared_fragment(&self.utility, &self.config.utility)?;
        let initial_methods =
            self.shared_fragment(&self.initial_methods, &self.config.initial_methods)?;

        let fragment_file = format!("{fragment_program}.frag");
        let fragment = self
            .source
            .fetch(&fragment_file)?
            .ok_or_else(|| LoadError::FragmentMissing {
                program: fragment_program.to_string(),
                location: self.source.describe(&fragment_file),
            })?;

        let mut assembled =
            String::with_capacity(utility.len() + initial_methods.len() + fragment.len() + 2);
        // Initial methods, then utility code, then the program.
        for part in [&*initial_methods, &*utility] {
            assembled.push_str(part);
            if !part.ends_with('\n') {
                assembled.push('\n');
            }
        }
        assembled.push_str(&fragment);

        let vertex = self.vertex_source(vertex_program)?;
        debug!(
            fragment = fragment_program,
            vertex = vertex_program,
            bytes = assembled.len(),
            "assembled shader text"
        );
        Ok(ShaderText::new(assembled, vertex))
    }

    fn shared_fragment(&self, slot: &Mutex<Option<Arc<str>>>, name: &str) -> Result<Arc<str>, LoadError> {
        // Held across the fetch so concurrent loads only fetch once.
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(text) = cached.as_ref() {
            return Ok(Arc::clone(text));
        }

        let file = format!("{name}.frag");
        let text: Arc<str> = self
            .source
            .fetch(&file)?
            .ok_or_else(|| LoadError::SharedFragmentMissing {
                name: name.to_string(),
                location: self.source.describe(&file),
            })?
            .into();
        debug!(fragment = name, "cached shared fragment");
        *cached = Some(Arc::clone(&text));
        Ok(text)
    }

    fn vertex_source(&self, program: &str) -> Result<Arc<str>, LoadError> {
        let file = format!("{program}.vert");
        match self.source.fetch(&file) {
            Ok(Some(text)) => Ok(text.into()),
            Ok(None) => {
                debug!(program, "no vertex source; using default plane vertex");
                Ok(self.default_vertex())
            }
            Err(err) => {
                warn!(program, error = %err, "vertex fetch failed; using default plane vertex");
                Ok(self.default_vertex())
            }
        }
    }

    fn default_vertex(&self) -> Arc<str> {
        let mut cached = self
            .default_vertex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(text) = cached.as_ref() {
            return Arc::clone(text);
        }

        let file = format!("{}.vert", self.config.default_vertex);
        let text: Arc<str> = match self.source.fetch(&file) {
            Ok(Some(text)) => text.into(),
            Ok(None) | Err(_) => {
                debug!(file, "default vertex unavailable; using built-in plane vertex");
                Arc::from(DEFAULT_PLANE_VERTEX)
            }
        };
        *cached = Some(Arc::clone(&text));
        text
    }
}

/// Eventual [`ShaderText`], polled from the frame loop.
#[derive(Debug)]
pub enum ShaderFuture {
    Ready(ShaderText),
    Threaded {
        receiver: Receiver<Result<ShaderText, LoadError>>,
    },
    Failed(LoadError),
}

impl ShaderFuture {
    pub fn ready(text: ShaderText) -> Self {
        ShaderFuture::Ready(text)
    }

    /// Creates an unresolved future together with the handle that resolves it.
    pub fn pending() -> (ShaderPromise, Self) {
        let (sender, receiver) = mpsc::channel();
        (ShaderPromise { sender }, ShaderFuture::Threaded { receiver })
    }

    /// Returns `Ok(None)` while the text is still loading.
    pub fn poll(&mut self) -> Result<Option<ShaderText>, LoadError> {
        let outcome = match self {
            ShaderFuture::Ready(text) => return Ok(Some(text.clone())),
            ShaderFuture::Failed(err) => return Err(err.clone()),
            ShaderFuture::Threaded { receiver } => match receiver.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => Err(LoadError::WorkerDisconnected),
            },
        };

        match outcome {
            Ok(text) => {
                *self = ShaderFuture::Ready(text.clone());
                Ok(Some(text))
            }
            Err(err) => {
                *self = ShaderFuture::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Blocks until the text resolves.
    pub fn wait(self) -> Result<ShaderText, LoadError> {
        match self {
            ShaderFuture::Ready(text) => Ok(text),
            ShaderFuture::Failed(err) => Err(err),
            ShaderFuture::Threaded { receiver } => receiver
                .recv()
                .map_err(|_| LoadError::WorkerDisconnected)?,
        }
    }
}

/// Resolves the paired [`ShaderFuture`] created by [`ShaderFuture::pending`].
#[derive(Debug)]
pub struct ShaderPromise {
    sender: Sender<Result<ShaderText, LoadError>>,
}

impl ShaderPromise {
    pub fn resolve(self, result: Result<ShaderText, LoadError>) {
        let _ = self.sender.send(result);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::DirectorySource;

    #[derive(Debug, Default)]
    struct CountingSource {
        files: HashMap<String, String>,
        fetches: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl CountingSource {
        fn with(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(name, body)| (name.to_string(), body.to_string()))
                    .collect(),
                ..Self::default()
            }
        }

        fn fetch_count(&self, file: &str) -> usize {
            self.fetches.lock().unwrap().get(file).copied().unwrap_or(0)
        }
    }

    impl ShaderSource for CountingSource {
        fn fetch(&self, file: &str) -> Result<Option<String>, LoadError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.fetches.lock().unwrap().entry(file.to_string()).or_default() += 1;
            Ok(self.files.get(file).cloned())
        }

        fn describe(&self, file: &str) -> String {
            format!("mem://{file}")
        }
    }

    fn shared_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("util.frag", "// util\n"),
            ("controls_init.frag", "// init\n"),
        ]
    }

    #[test]
    fn missing_vertex_falls_back_to_default_plane() {
        let mut files = shared_files();
        files.push(("flocking/texture.frag", "void main() {}"));
        let loader = ShaderTextLoader::new(
            Arc::new(CountingSource::with(&files)),
            LoaderConfig::default(),
        );

        let text = loader.load("flocking/texture").wait().expect("load");
        assert_eq!(text.fragment_source(), "// init\n// util\nvoid main() {}");
        assert_eq!(text.vertex_source(), DEFAULT_PLANE_VERTEX);
    }

    #[test]
    fn default_vertex_prefers_source_plane_program() {
        let mut files = shared_files();
        files.push(("demo.frag", "void main() {}"));
        files.push(("plane.vert", "// plane from source"));
        let loader = ShaderTextLoader::new(
            Arc::new(CountingSource::with(&files)),
            LoaderConfig::default(),
        );

        let text = loader.load_blocking("demo").unwrap();
        assert_eq!(text.vertex_source(), "// plane from source");
    }

    #[test]
    fn missing_fragment_is_a_load_failure() {
        let loader = ShaderTextLoader::new(
            Arc::new(CountingSource::with(&shared_files())),
            LoaderConfig::default(),
        );

        let err = loader.load("absent").wait().unwrap_err();
        assert!(matches!(err, LoadError::FragmentMissing { ref program, .. } if program == "absent"));
    }

    #[test]
    fn shared_fragments_are_fetched_once() {
        let mut files = shared_files();
        files.push(("a.frag", "// a"));
        files.push(("b.frag", "// b"));
        let source = Arc::new(CountingSource::with(&files));
        let loader = ShaderTextLoader::new(source.clone(), LoaderConfig::default());

        loader.load_blocking("a").unwrap();
        loader.load_blocking("b").unwrap();
        loader.load("a").wait().unwrap();

        assert_eq!(source.fetch_count("util.frag"), 1);
        assert_eq!(source.fetch_count("controls_init.frag"), 1);
        assert_eq!(source.fetch_count("plane.vert"), 1);
        assert_eq!(source.fetch_count("a.frag"), 2);
    }

    #[test]
    fn varied_load_pairs_fragment_and_vertex_of_different_programs() {
        let mut files = shared_files();
        files.push(("flocking/velocity.frag", "// velocity"));
        files.push(("flocking/texture.vert", "// texture vertex"));
        let loader = ShaderTextLoader::new(
            Arc::new(CountingSource::with(&files)),
            LoaderConfig::default(),
        );

        let text = loader
            .load_varied_blocking("flocking/velocity", "flocking/texture")
            .unwrap();
        assert!(text.fragment_source().ends_with("// velocity"));
        assert_eq!(text.vertex_source(), "// texture vertex");
    }

    #[test]
    fn pending_future_resolves_through_promise() {
        let (promise, mut future) = ShaderFuture::pending();
        assert_eq!(future.poll().unwrap(), None);

        promise.resolve(Ok(ShaderText::new("frag", "vert")));
        let text = future.poll().unwrap().expect("resolved");
        assert_eq!(text.fragment_source(), "frag");
        // Resolved futures keep answering.
        assert!(future.poll().unwrap().is_some());
    }

    #[test]
    fn failed_future_keeps_reporting_its_error() {
        let (promise, mut future) = ShaderFuture::pending();
        promise.resolve(Err(LoadError::WorkerDisconnected));
        assert!(future.poll().is_err());
        assert_eq!(future.poll().unwrap_err(), LoadError::WorkerDisconnected);
    }

    #[test]
    fn loads_from_directory_layout() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("flocking")).unwrap();
        std::fs::write(temp.path().join("util.frag"), "// util").unwrap();
        std::fs::write(temp.path().join("no_controls.frag"), "// none").unwrap();
        std::fs::write(temp.path().join("flocking/position.frag"), "// pos").unwrap();

        let loader = ShaderTextLoader::new(
            Arc::new(DirectorySource::new(temp.path())),
            LoaderConfig::without_controls(),
        );
        let text = loader.load_blocking("flocking/position").unwrap();
        assert_eq!(text.fragment_source(), "// none\n// util\n// pos");
        assert_eq!(text.vertex_source(), DEFAULT_PLANE_VERTEX);
    }
}
