//! Shader program library
//!
//! Compiled shader modules are identified by an opaque [`ShaderId`] that
//! the draw dispatcher uses to group materials sharing one program. The
//! library deduplicates by source path and stage, so loading the same
//! shader twice yields the same id. A shader that cannot be read or
//! compiled is a fatal, non-retried failure for that resource.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use super::RenderError;

/// Global counter for shader program identities
static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// Pipeline stage a shader module belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

/// Source path plus stage, the deduplication key for loaded shaders
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderKey {
    /// Path to the WGSL source file
    pub path: PathBuf,
    /// Stage the module is used in
    pub stage: ShaderStage,
}

impl ShaderKey {
    /// Create a key from a path and stage
    pub fn new(path: impl Into<PathBuf>, stage: ShaderStage) -> Self {
        Self {
            path: path.into(),
            stage,
        }
    }

    /// A key is valid when it names a non-empty path
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.stage)
    }
}

/// Opaque identity of a compiled shader program.
///
/// Used purely for comparison and grouping; the compiled module itself
/// stays inside the [`ShaderLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(u64);

impl ShaderId {
    /// Allocate a fresh shader identity.
    ///
    /// Normally done by [`ShaderLibrary::load`]; exposed so tests and
    /// external backends can mint ids without a GPU device.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shader#{}", self.0)
    }
}

/// Library of compiled shader modules, deduplicated by [`ShaderKey`]
#[derive(Default)]
pub struct ShaderLibrary {
    /// Compiled modules by identity
    modules: FxHashMap<ShaderId, wgpu::ShaderModule>,
    /// Key-to-identity mapping for deduplication
    by_key: FxHashMap<ShaderKey, ShaderId>,
}

impl ShaderLibrary {
    /// Create an empty library
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and compile a shader from disk, reusing a previous load of
    /// the same key.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderLoad`] when the source file cannot be
    /// read; the failure is logged with the offending path and aborts
    /// creation of this resource.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        key: &ShaderKey,
    ) -> Result<ShaderId, RenderError> {
        if !key.is_valid() {
            return Err(RenderError::ShaderLoad {
                path: key.path.clone(),
                reason: "empty shader path".to_string(),
            });
        }

        if let Some(&id) = self.by_key.get(key) {
            log::debug!("Shader {key} already loaded, reusing {id}");
            return Ok(id);
        }

        let source = std::fs::read_to_string(&key.path).map_err(|e| {
            log::error!("Cannot open shader file {}: {e}", key.path.display());
            RenderError::ShaderLoad {
                path: key.path.clone(),
                reason: e.to_string(),
            }
        })?;

        let id = self.add_module(device, &source, Some(&key.path));
        self.by_key.insert(key.clone(), id);
        log::info!("Shader {key} loaded as {id}");
        Ok(id)
    }

    /// Compile a shader from in-memory WGSL source (built-in shaders)
    pub fn add_source(&mut self, device: &wgpu::Device, source: &str) -> ShaderId {
        self.add_module(device, source, None)
    }

    fn add_module(&mut self, device: &wgpu::Device, source: &str, path: Option<&Path>) -> ShaderId {
        let label = path.map(|p| p.display().to_string());
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let id = ShaderId::next();
        self.modules.insert(id, module);
        id
    }

    /// Get a compiled module by identity
    #[must_use]
    pub fn get(&self, id: ShaderId) -> Option<&wgpu::ShaderModule> {
        self.modules.get(&id)
    }

    /// Check whether a key was already loaded
    #[must_use]
    pub fn contains_key(&self, key: &ShaderKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Number of distinct compiled modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check whether the library is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
