//! Rendering error types.
//!
//! Only load-time configuration failures surface as errors. Steady-state
//! per-frame rendering never fails: not-yet-ready assets are skipped at
//! draw-list build time, and contract violations (mismatched vertex layouts,
//! double add/remove of a draw-list item) panic immediately because they
//! indicate a caller bug rather than a recoverable condition.

use thiserror::Error;

/// Errors that can occur while preparing rendering resources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A shader failed to compile. Carries the compiler's diagnostic log.
    #[error("shader compilation failed for {label:?}: {log}")]
    ShaderCompileFailed {
        /// Shader label for diagnostics.
        label: String,
        /// Native compiler log.
        log: String,
    },

    /// A shader program failed to link. Carries the linker's diagnostic log.
    #[error("program link failed for {label:?}: {log}")]
    ProgramLinkFailed {
        /// Program label for diagnostics.
        label: String,
        /// Native linker log.
        log: String,
    },

    /// A mesh submission is too large to fit even a freshly created
    /// geometry buffer with the pool's index format.
    #[error("mesh {label:?} does not fit any geometry buffer ({vertices} vertices, {indices} indices)")]
    GeometryTooLarge {
        /// Mesh label for diagnostics.
        label: Option<String>,
        /// Vertex count of the rejected submission.
        vertices: usize,
        /// Index count of the rejected submission.
        indices: usize,
    },

    /// A vertex layout is malformed (zero attributes, zero stride).
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),

    /// Mesh data is inconsistent with its declared layout or element ranges.
    #[error("invalid mesh data: {0}")]
    InvalidMeshData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::GeometryTooLarge {
            label: Some("terrain".to_string()),
            vertices: 5_000_000,
            indices: 15_000_000,
        };
        assert!(err.to_string().contains("terrain"));
        assert!(err.to_string().contains("5000000"));

        let err = RenderError::ShaderCompileFailed {
            label: "water".to_string(),
            log: "0:12: undeclared identifier".to_string(),
        };
        assert!(err.to_string().contains("undeclared identifier"));
    }
}
