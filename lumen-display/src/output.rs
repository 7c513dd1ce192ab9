//! The output seam the display draws into, and the client seam it reports
//! failures through.

use thiserror::Error;

use crate::aggregator::AggregatedFrame;
use lumen_core::Size;

/// Errors reported by an output surface.
#[derive(Debug, Error)]
pub enum OutputSurfaceError {
    /// The backing output is gone (context loss, window teardown). The
    /// display latches into its lost state and the embedder must supply a
    /// fresh output surface.
    #[error("output surface lost: {0}")]
    Lost(String),
}

/// Where aggregated frames go. Implementations wrap a swapchain, a window,
/// or (in tests and software embedders) plain memory.
pub trait OutputSurface {
    /// Current pixel size of the output.
    fn surface_size(&self) -> Size<u32>;

    /// Resizes the backing output.
    fn resize(&mut self, size: Size<u32>);

    /// Presents an aggregated frame. An error means the output is lost for
    /// good; the display will not call again until it is replaced.
    fn swap_buffers(&mut self, frame: &AggregatedFrame) -> Result<(), OutputSurfaceError>;
}

/// Owner-side callbacks of a display.
pub trait DisplayClient {
    /// The display's output surface failed; drawing is suspended until the
    /// owner supplies a new one.
    fn display_output_surface_lost(&mut self);
}

/// An in-memory output surface. Counts swaps and can be told to fail,
/// which is all software embedders and tests need.
#[derive(Debug)]
pub struct SoftwareOutputSurface {
    size: Size<u32>,
    swapped_frames: usize,
    last_pass_count: usize,
    fail_next_swap: bool,
}

impl SoftwareOutputSurface {
    /// Creates an output of the given size.
    pub fn new(size: Size<u32>) -> Self {
        SoftwareOutputSurface {
            size,
            swapped_frames: 0,
            last_pass_count: 0,
            fail_next_swap: false,
        }
    }

    /// Number of frames successfully swapped.
    pub fn swapped_frames(&self) -> usize {
        self.swapped_frames
    }

    /// Pass count of the most recently swapped frame.
    pub fn last_pass_count(&self) -> usize {
        self.last_pass_count
    }

    /// Makes the next swap fail with [`OutputSurfaceError::Lost`].
    pub fn fail_next_swap(&mut self) {
        self.fail_next_swap = true;
    }
}

impl OutputSurface for SoftwareOutputSurface {
    fn surface_size(&self) -> Size<u32> {
        self.size
    }

    fn resize(&mut self, size: Size<u32>) {
        self.size = size;
    }

    fn swap_buffers(&mut self, frame: &AggregatedFrame) -> Result<(), OutputSurfaceError> {
        if self.fail_next_swap {
            self.fail_next_swap = false;
            return Err(OutputSurfaceError::Lost("simulated output loss".to_string()));
        }
        self.swapped_frames += 1;
        self.last_pass_count = frame.render_passes.len();
        Ok(())
    }
}
