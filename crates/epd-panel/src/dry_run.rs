//! A driver that records frames instead of showing them.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::driver::{DisplayMode, NativePanelDriver};
use crate::spec::{DisplaySpec, FirmwareType};
use crate::{PanelError, Result};

/// Keeps the most recent frame in memory and optionally dumps every frame to
/// `<dir>/frame-<n>.bin`.
#[derive(Debug)]
pub struct DryRunDriver {
    spec: DisplaySpec,
    initialized: bool,
    frame_dir: Option<PathBuf>,
    frames_shown: usize,
    last_frame: Option<Vec<u8>>,
    last_mode: Option<DisplayMode>,
}

impl DryRunDriver {
    pub fn new(firmware: FirmwareType) -> Self {
        Self {
            spec: firmware.spec(),
            initialized: false,
            frame_dir: None,
            frames_shown: 0,
            last_frame: None,
            last_mode: None,
        }
    }

    /// Builder: write each frame to `dir`.
    pub fn with_frame_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frame_dir = Some(dir.into());
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }

    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last_frame.as_deref()
    }

    pub fn last_mode(&self) -> Option<DisplayMode> {
        self.last_mode
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(PanelError::NotInitialized)
        }
    }
}

impl NativePanelDriver for DryRunDriver {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn spec(&self) -> DisplaySpec {
        self.spec
    }

    fn initialize(&mut self) -> Result<()> {
        if let Some(dir) = &self.frame_dir {
            std::fs::create_dir_all(dir)?;
        }
        self.initialized = true;
        info!(panel = self.spec.name, "Dry-run display initialized");
        Ok(())
    }

    fn display_raw(&mut self, data: &[u8], mode: DisplayMode) -> Result<()> {
        self.ensure_initialized()?;
        let expected = self.spec.array_size();
        if data.len() != expected {
            return Err(PanelError::FrameSize {
                expected,
                actual: data.len(),
            });
        }

        if let Some(dir) = &self.frame_dir {
            let path = dir.join(format!("frame-{}.bin", self.frames_shown));
            std::fs::write(&path, data)?;
            debug!(path = %path.display(), "Wrote frame");
        }

        self.frames_shown += 1;
        self.last_frame = Some(data.to_vec());
        self.last_mode = Some(mode);
        info!(frame = self.frames_shown, %mode, bytes = data.len(), "Displayed frame");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let white = vec![0xFF; self.spec.array_size()];
        self.display_raw(&white, DisplayMode::Full)
    }

    fn sleep(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.initialized = false;
        debug!("Dry-run display asleep");
        Ok(())
    }
}
