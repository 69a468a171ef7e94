use thiserror::Error;
use vellum_backend::ShaderStage;

/// Errors raised while constructing render resources.
///
/// Construction errors are returned to the caller synchronously and never
/// retried. Stale or repeated deletes are not errors and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A shader stage failed to compile or the program failed to link.
    #[error("shader '{label}' failed in the {stage} stage: {log}")]
    ShaderCompilation {
        label: String,
        stage: ShaderStage,
        log: String,
    },

    /// The backend only runs legacy shaders and none were supplied.
    #[error("shader '{label}' has no legacy source and the backend only supports legacy shaders")]
    UnsupportedBackendVersion { label: String },

    /// A texture, tile sheet or mip chain has dimensions that do not fit.
    #[error("invalid {resource} size {width}x{height}: {reason}")]
    InvalidResourceSize {
        resource: &'static str,
        width: u32,
        height: u32,
        reason: String,
    },

    /// A pixel buffer does not hold `width * height` RGBA8 pixels.
    #[error("pixel data has {actual} bytes, expected {expected}")]
    InvalidPixelData { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, RenderError>;
