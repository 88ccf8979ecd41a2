//! Per-session frame loop state
use std::cell::Cell;
use std::rc::Rc;

/// Stop switch shared between a session's loop and whoever owns it
#[derive(Debug, Clone, Default)]
pub struct LoopHandle(Rc<Cell<bool>>);

impl LoopHandle {
    pub fn stop(&self) {
        self.0.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.0.get()
    }

    fn start(&self) {
        self.0.set(true);
    }
}

/// Frame counter and running flag for one session.
///
/// The host schedules frames (a display refresh callback, a timer); the loop
/// only records whether another frame should be scheduled.
#[derive(Debug, Default)]
pub struct RunLoop {
    handle: LoopHandle,
    frames: u64,
}

impl RunLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.handle.start();
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub(crate) fn record_frame(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_starts_stopped() {
        let run_loop = RunLoop::new();
        assert!(!run_loop.is_running());
        assert_eq!(run_loop.frames(), 0);
    }

    #[test]
    fn test_handle_stops_loop() {
        let mut run_loop = RunLoop::new();
        run_loop.start();
        let handle = run_loop.handle();
        assert!(run_loop.is_running());

        handle.stop();
        assert!(!run_loop.is_running());
    }
}
