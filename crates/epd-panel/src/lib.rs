//! Boundary to the physical e-paper panel.
//!
//! The conversion pipeline only needs to hand a finished frame to something
//! that can show it. [`NativePanelDriver`] is that seam; the concrete native
//! binding lives outside this workspace, and [`DryRunDriver`] stands in for
//! it on machines without a panel.

pub mod driver;
pub mod dry_run;
pub mod spec;

// Re-exports for convenience
pub use driver::{DisplayMode, NativePanelDriver};
pub use dry_run::DryRunDriver;
pub use spec::{DisplaySpec, FirmwareType};

/// Errors that can occur while driving a panel.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("Display not initialized")]
    NotInitialized,

    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Unknown firmware type: {0}")]
    UnknownFirmware(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;
