/// Terminal host: one ASCII viewer per STL file
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use stlview_core::ViewerSession;

pub mod host;
pub mod renderer;

pub use host::{FileFetcher, FilePage, TerminalSurface};
pub use renderer::{terminal_viewport, AsciiRenderer};

/// Radians turned per rotation key press
const ROTATE_STEP: f32 = 0.1;

/// Magnification applied per zoom key press
const ZOOM_STEP: f32 = 1.0 / 0.95;

/// Interactive application showing one viewer session at a time
pub struct TerminalApp {
    sessions: Vec<ViewerSession<AsciiRenderer>>,
    active: usize,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(sessions: Vec<ViewerSession<AsciiRenderer>>) -> Self {
        Self {
            sessions,
            active: 0,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn active_session(&self) -> Option<&ViewerSession<AsciiRenderer>> {
        self.sessions.get(self.active)
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        for session in &self.sessions {
            session.loop_handle().stop();
        }
        Ok(())
    }

    /// Apply one key press: rotate, zoom, switch viewer or quit
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Tab if !self.sessions.is_empty() => {
                self.active = (self.active + 1) % self.sessions.len();
            }
            KeyCode::BackTab if !self.sessions.is_empty() => {
                self.active = (self.active + self.sessions.len() - 1) % self.sessions.len();
            }
            code => {
                let Some(controls) = self
                    .sessions
                    .get_mut(self.active)
                    .and_then(|s| s.controls_mut())
                else {
                    return;
                };
                match code {
                    KeyCode::Char('w') | KeyCode::Up => controls.rotate_up(ROTATE_STEP),
                    KeyCode::Char('s') | KeyCode::Down => controls.rotate_up(-ROTATE_STEP),
                    KeyCode::Char('a') | KeyCode::Left => controls.rotate_left(ROTATE_STEP),
                    KeyCode::Char('d') | KeyCode::Right => controls.rotate_left(-ROTATE_STEP),
                    KeyCode::Char('+') | KeyCode::Char('=') => controls.zoom_by(ZOOM_STEP),
                    KeyCode::Char('-') => controls.zoom_by(1.0 / ZOOM_STEP),
                    _ => {}
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn render(&mut self) -> io::Result<()> {
        let count = self.sessions.len();
        let Some(session) = self.sessions.get_mut(self.active) else {
            self.running = false;
            return Ok(());
        };

        if let Err(err) = session.frame() {
            log::error!("Viewer {} failed to render: {}", session.id(), err);
        }

        let mut stdout = stdout();
        session.renderer().draw(&mut stdout)?;

        // Status line
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "STLView | {} ({}/{}) {} | FPS: {:.1} | WASD/Arrows=Rotate +/-=Zoom Tab=Next Q=Quit",
                session.source(),
                self.active + 1,
                count,
                session.state(),
                self.fps
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use stlview_core::{ContainerDescriptor, SequentialIds, ViewerBootstrapper, ViewerConfig};

    fn app(count: usize) -> TerminalApp {
        let mut boot =
            ViewerBootstrapper::with_id_generator(ViewerConfig::default(), SequentialIds::default())
                .unwrap();
        let mut containers: Vec<_> = (0..count)
            .map(|i| ContainerDescriptor::new(i, terminal_viewport(40, 20)).with_source(format!("{i}.stl")))
            .collect();
        TerminalApp::new(boot.bootstrap(&mut containers, &mut TerminalSurface))
    }

    fn press(app: &mut TerminalApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_tab_cycles_viewers() {
        let mut app = app(3);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.active_session().map(|s| s.id()), Some("stl-viewer-1"));
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.active_session().map(|s| s.id()), Some("stl-viewer-2"));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app(1);
        assert!(app.is_running());
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.is_running());
    }

    #[test]
    fn test_rotation_keys_move_active_camera() {
        let mut app = app(2);
        let before = app.sessions[0].camera.position;
        press(&mut app, KeyCode::Left);
        app.sessions[0].frame().unwrap();

        assert_ne!(app.sessions[0].camera.position, before);
        assert_eq!(app.sessions[1].frames(), 0);
    }

    #[test]
    fn test_zoom_keys_change_camera_zoom() {
        let mut app = app(1);
        press(&mut app, KeyCode::Char('+'));
        app.sessions[0].frame().unwrap();
        assert!(app.sessions[0].camera.zoom > 1.0);
    }
}
