//! Error types
//!
//! Every failure the renderer can hit at startup ends up in a [`RenderError`].
//! None of them are retried: the caller logs the error, cleans up and exits.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use thiserror::Error;

/// Shader loading and program linking failures.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("could not read shader '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader '{name}' failed to parse:\n{message}")]
    Parse { name: String, message: String },

    #[error("shader '{name}' failed validation:\n{message}")]
    Validation { name: String, message: String },

    #[error("shader '{name}' has no {stage} entry point")]
    MissingStage { name: String, stage: &'static str },

    #[error("program '{label}' failed to link: {message}")]
    Link { label: String, message: String },
}

/// Model, texture and cubemap loading failures.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not load model '{}': {message}", path.display())]
    Model { path: PathBuf, message: String },

    #[error("could not load texture '{}': {message}", path.display())]
    Texture { path: PathBuf, message: String },

    #[error("could not load cubemap from '{}': {message}", dir.display())]
    Cubemap { dir: PathBuf, message: String },
}

/// Top-level renderer error.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("window creation failed: {0}")]
    Window(String),

    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("GPU error while {context}: {message}")]
    Gpu { context: String, message: String },
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Runs `f` inside a validation error scope and returns its value together
/// with the first validation error it raised, if any.
pub fn capture_validation<T>(
    device: &wgpu::Device,
    f: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let error = pollster::block_on(device.pop_error_scope());
    (value, error)
}

/// Like [`capture_validation`], but turns a captured error into
/// [`RenderError::Gpu`].
pub fn with_validation<T>(
    device: &wgpu::Device,
    context: &str,
    f: impl FnOnce() -> T,
) -> Result<T> {
    match capture_validation(device, f) {
        (_, Some(err)) => Err(RenderError::Gpu {
            context: context.to_string(),
            message: err.to_string(),
        }),
        (value, None) => Ok(value),
    }
}

/// Collects GPU errors raised outside any error scope. wgpu panics on those
/// by default; with this handler installed they are logged and later turned
/// into a [`RenderError::Gpu`] by [`UncapturedErrors::check`].
#[derive(Debug, Clone, Default)]
pub struct UncapturedErrors {
    first: Arc<Mutex<Option<String>>>,
}

impl UncapturedErrors {
    pub fn install(device: &wgpu::Device) -> Self {
        let errors = Self::default();
        let sink = errors.clone();
        device.on_uncaptured_error(Box::new(move |err: wgpu::Error| sink.record(err.to_string())));
        errors
    }

    /// Keeps the first message; later ones are only logged.
    pub fn record(&self, message: String) {
        log::error!("Uncaptured GPU error: {message}");
        if let Ok(mut first) = self.first.lock() {
            first.get_or_insert(message);
        }
    }

    /// Fails with the first recorded error, clearing it.
    pub fn check(&self, context: &str) -> Result<()> {
        let message = self.first.lock().ok().and_then(|mut first| first.take());
        match message {
            Some(message) => Err(RenderError::Gpu {
                context: context.to_string(),
                message,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_error_messages_name_the_file() {
        let err = ShaderError::Read {
            path: PathBuf::from("shaders/depth.wgsl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let text = err.to_string();
        assert!(text.contains("shaders/depth.wgsl"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn test_render_error_is_transparent_over_shader_error() {
        let err: RenderError = ShaderError::MissingStage {
            name: "ui".into(),
            stage: "fragment",
        }
        .into();
        assert_eq!(err.to_string(), "shader 'ui' has no fragment entry point");
    }

    #[test]
    fn test_uncaptured_errors_report_the_first_message_once() {
        let errors = UncapturedErrors::default();
        assert!(errors.check("rendering a frame").is_ok());

        errors.clone().record("texture too large".into());
        errors.record("second".into());
        let err = errors.check("rendering a frame").unwrap_err();
        assert_eq!(
            err.to_string(),
            "GPU error while rendering a frame: texture too large"
        );
        assert!(errors.check("rendering a frame").is_ok());
    }
}
