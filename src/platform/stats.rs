//! Frame rate monitor

/// Frames in the rolling window
pub const FPS_WINDOW: usize = 60;

/// Below this the monitor warns
pub const LOW_FPS: f32 = 30.0;

/// Rolling FPS over the last [`FPS_WINDOW`] frames
#[derive(Debug, Clone)]
pub struct FrameStats {
    frame_times: [f64; FPS_WINDOW],
    frame_index: usize,
    filled: usize,
    fps: f32,
    frames_since_warning: usize,
    warnings: u32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            frame_times: [0.0; FPS_WINDOW],
            frame_index: 0,
            filled: 0,
            fps: 0.0,
            frames_since_warning: FPS_WINDOW,
            warnings: 0,
        }
    }
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a presented frame at `now` seconds; returns the current FPS
    pub fn record(&mut self, now: f64) -> f32 {
        self.frame_times[self.frame_index] = now;
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;
        self.filled = (self.filled + 1).min(FPS_WINDOW);

        // Oldest frame still in the window
        let oldest = if self.filled == FPS_WINDOW {
            self.frame_times[self.frame_index]
        } else {
            self.frame_times[0]
        };
        let elapsed = now - oldest;
        if elapsed > 0.0 {
            self.fps = ((self.filled - 1) as f64 / elapsed) as f32;
        }

        self.frames_since_warning += 1;
        if self.filled == FPS_WINDOW && self.fps < LOW_FPS && self.frames_since_warning >= FPS_WINDOW {
            log::warn!("Low FPS: {:.1}", self.fps);
            self.frames_since_warning = 0;
            self.warnings += 1;
        }
        self.fps
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn is_low(&self) -> bool {
        self.filled == FPS_WINDOW && self.fps < LOW_FPS
    }

    /// Low-FPS warnings emitted so far
    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
