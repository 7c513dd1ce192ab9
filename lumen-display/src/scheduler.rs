//! Damage-driven draw scheduling for one display.
//!
//! The scheduler sits between the registry's damage fan-out and the
//! display's draw loop: surface damage arms it, a begin-frame tick turns an
//! armed scheduler into a pending draw, and the display consumes the
//! pending draw on its next `draw_and_swap`. Swap backpressure is a simple
//! in-flight counter.

use lumen_surfaces::begin_frame::{BeginFrameArgs, BeginFrameObserver};
use lumen_surfaces::client::SurfaceObserver;
use lumen_surfaces::id::SurfaceId;

/// Tuning knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySchedulerConfig {
    /// Swaps allowed in flight before the scheduler stops issuing draws.
    pub max_pending_swaps: u32,
}

impl Default for DisplaySchedulerConfig {
    fn default() -> Self {
        Self {
            max_pending_swaps: 1,
        }
    }
}

/// Decides when the display should draw.
#[derive(Debug)]
pub struct DisplayScheduler {
    config: DisplaySchedulerConfig,
    root_surface_id: Option<SurfaceId>,
    damaged: bool,
    draw_pending: bool,
    pending_swaps: u32,
}

impl DisplayScheduler {
    /// Creates a scheduler with the given config.
    pub fn new(config: DisplaySchedulerConfig) -> Self {
        DisplayScheduler {
            config,
            root_surface_id: None,
            damaged: false,
            draw_pending: false,
            pending_swaps: 0,
        }
    }

    /// Sets the surface the display currently shows and arms a first draw
    /// for it.
    pub fn set_root_surface(&mut self, surface_id: SurfaceId) {
        self.root_surface_id = Some(surface_id);
        self.damaged = true;
    }

    /// Whether a draw is pending.
    pub fn draw_pending(&self) -> bool {
        self.draw_pending
    }

    /// Whether damage has arrived since the last draw.
    pub fn damaged(&self) -> bool {
        self.damaged
    }

    /// The display consumed the pending draw and submitted a swap.
    pub fn did_draw(&mut self) {
        self.damaged = false;
        self.draw_pending = false;
        self.pending_swaps += 1;
    }

    /// A previously submitted swap completed.
    pub fn did_swap_complete(&mut self) {
        self.pending_swaps = self.pending_swaps.saturating_sub(1);
    }
}

impl Default for DisplayScheduler {
    fn default() -> Self {
        Self::new(DisplaySchedulerConfig::default())
    }
}

impl SurfaceObserver for DisplayScheduler {
    fn on_surface_damaged(&mut self, _surface_id: SurfaceId) -> bool {
        // Any damage arms the next draw once a root is set; aggregation
        // decides what is actually visible.
        if self.root_surface_id.is_none() {
            return false;
        }
        self.damaged = true;
        true
    }
}

impl BeginFrameObserver for DisplayScheduler {
    fn on_begin_frame(&mut self, _args: BeginFrameArgs) {
        if self.damaged && self.pending_swaps < self.config.max_pending_swaps {
            self.draw_pending = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_surfaces::id::{FrameSinkId, LocalFrameId};
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    fn args() -> BeginFrameArgs {
        BeginFrameArgs {
            frame_time: Instant::now(),
            interval: Duration::from_millis(16),
            sequence_number: 1,
        }
    }

    fn root() -> SurfaceId {
        SurfaceId::new(FrameSinkId::new(1, 0), LocalFrameId::new(1, Uuid::nil()))
    }

    #[test]
    fn test_damage_without_root_is_ignored() {
        let mut scheduler = DisplayScheduler::default();
        assert!(!scheduler.on_surface_damaged(root()));
        scheduler.on_begin_frame(args());
        assert!(!scheduler.draw_pending());
    }

    #[test]
    fn test_damage_then_tick_arms_a_draw() {
        let mut scheduler = DisplayScheduler::default();
        scheduler.set_root_surface(root());
        assert!(scheduler.damaged());

        scheduler.on_begin_frame(args());
        assert!(scheduler.draw_pending());

        scheduler.did_draw();
        assert!(!scheduler.draw_pending());
        assert!(!scheduler.damaged());
    }

    #[test]
    fn test_tick_without_damage_stays_idle() {
        let mut scheduler = DisplayScheduler::default();
        scheduler.set_root_surface(root());
        scheduler.did_draw();
        scheduler.did_swap_complete();

        scheduler.on_begin_frame(args());
        assert!(!scheduler.draw_pending());
    }

    #[test]
    fn test_pending_swap_backpressure() {
        let mut scheduler = DisplayScheduler::default();
        scheduler.set_root_surface(root());
        scheduler.on_begin_frame(args());
        scheduler.did_draw();

        // One swap in flight with max_pending_swaps = 1: damage cannot arm
        // another draw until the swap completes.
        assert!(scheduler.on_surface_damaged(root()));
        scheduler.on_begin_frame(args());
        assert!(!scheduler.draw_pending());

        scheduler.did_swap_complete();
        scheduler.on_begin_frame(args());
        assert!(scheduler.draw_pending());
    }
}
