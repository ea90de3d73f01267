//! Shader module compilation with user-visible diagnostics.
//!
//! [`ShaderLibrary`] compiles WGSL inside a validation error scope: a broken
//! shader produces a [`ShaderError`] and a notification, never a panic inside
//! the render loop. The caller decides whether a failed program is fatal
//! (startup) or degrades the frame (variant reload).

use islet_log::Notifier;
use log::{debug, info};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

/// Error types for shader loading operations.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{name}' failed to compile: {message}")]
    CompilationFailed { name: String, message: String },

    #[error("shader '{name}' not found in library")]
    NotLoaded { name: String },
}

/// Central registry for compiled shader modules.
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    /// Create a new empty shader library.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Compile a WGSL source string and register it under `name`.
    ///
    /// Compilation runs inside a validation error scope, so malformed WGSL
    /// is captured and surfaced through `notifier` instead of tripping the
    /// global uncaptured-error handler.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        notifier: &dyn Notifier,
        name: &str,
        source: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        debug!("Loading shader '{}' from source", name);

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        let error = pollster::block_on(scope.pop());

        if let Some(error) = error {
            let message = error.to_string();
            notifier.notify(&format!("shader '{name}' failed to compile: {message}"));
            return Err(ShaderError::CompilationFailed {
                name: name.to_string(),
                message,
            });
        }

        let arc_module = Arc::new(module);
        let replaced = self
            .modules
            .insert(name.to_string(), arc_module.clone())
            .is_some();

        if replaced {
            info!("Replaced shader '{}'", name);
        } else {
            info!("Loaded shader '{}'", name);
        }

        Ok(arc_module)
    }

    /// Get a previously loaded shader by name.
    pub fn get(&self, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        self.modules.get(name).cloned()
    }

    /// Get a previously loaded shader or a [`ShaderError::NotLoaded`].
    pub fn require(&self, name: &str) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        self.get(name).ok_or_else(|| ShaderError::NotLoaded {
            name: name.to_string(),
        })
    }

    /// Number of loaded shaders.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the shader library is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_support::create_test_device;
    use islet_log::{ChannelNotifier, LogNotifier};

    const VALID_SHADER: &str = r#"
        @vertex
        fn vs_main(@builtin(vertex_index) idx: u32) -> @builtin(position) vec4<f32> {
            return vec4<f32>(0.0, 0.0, 0.0, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    const INVALID_SHADER: &str = r#"
        @vertex
        fn vs_main() -> @builtin(position) vec4<f32> {
            return undeclared_variable;
        }
    "#;

    #[test]
    fn test_load_valid_shader_succeeds() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let result = library.load_from_source(&device, &LogNotifier, "test", VALID_SHADER);
        assert!(result.is_ok());
        assert_eq!(library.len(), 1);
    }

    /// A deliberately broken shader yields an error and a non-empty
    /// diagnostic on the notification channel; the process does not die.
    #[test]
    fn test_invalid_shader_reports_and_does_not_panic() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let (notifier, rx) = ChannelNotifier::new();
        let mut library = ShaderLibrary::new();

        let result = library.load_from_source(&device, &notifier, "bad", INVALID_SHADER);
        assert!(matches!(
            result,
            Err(ShaderError::CompilationFailed { .. })
        ));

        let diagnostic = rx.try_recv().expect("expected a diagnostic");
        assert!(!diagnostic.is_empty());
        assert!(diagnostic.contains("bad"));

        // The failed module is not registered.
        assert!(library.get("bad").is_none());
    }

    #[test]
    fn test_cache_returns_same_module_for_same_name() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        library
            .load_from_source(&device, &LogNotifier, "shared", VALID_SHADER)
            .unwrap();

        let a = library.get("shared").unwrap();
        let b = library.get("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_require_missing_shader_is_reportable() {
        let library = ShaderLibrary::new();
        assert!(matches!(
            library.require("nonexistent"),
            Err(ShaderError::NotLoaded { .. })
        ));
    }

    #[test]
    fn test_shader_library_starts_empty() {
        let library = ShaderLibrary::new();
        assert!(library.is_empty());
        assert_eq!(library.len(), 0);
    }
}
