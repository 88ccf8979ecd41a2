/// STLView Terminal - shaded ASCII viewers for STL files
///
/// Usage: stlview-terminal [--config viewer.json] <model.stl>...
///
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera
///   - +/-: Zoom
///   - Tab / Shift+Tab: Switch model
///   - Q/ESC: Quit

use std::io;
use std::path::PathBuf;
use stlview_core::{ViewerBootstrapper, ViewerConfig};
use stlview_terminal::{terminal_viewport, FileFetcher, FilePage, TerminalApp, TerminalSurface};

struct Args {
    config: Option<PathBuf>,
    models: Vec<PathBuf>,
}

fn parse_args() -> io::Result<Args> {
    let mut args = Args {
        config: None,
        models: Vec::new(),
    };
    let mut iter = std::env::args_os().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "--config needs a file path")
            })?;
            args.config = Some(PathBuf::from(path));
        } else {
            args.models.push(PathBuf::from(arg));
        }
    }
    Ok(args)
}

fn load_config(path: Option<&PathBuf>) -> io::Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let json = std::fs::read_to_string(path)?;
    ViewerConfig::from_json(&json).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    if args.models.is_empty() {
        eprintln!("Usage: stlview-terminal [--config viewer.json] <model.stl>...");
        return Ok(());
    }

    let config = load_config(args.config.as_ref())?;
    let mut bootstrapper = ViewerBootstrapper::new(config)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let (columns, rows) = crossterm::terminal::size()?;
    let page = FilePage::new(args.models, terminal_viewport(columns, rows));
    let mut containers = bootstrapper.discover_containers(&page);
    let mut sessions = bootstrapper.bootstrap(&mut containers, &mut TerminalSurface);

    let fetcher = FileFetcher;
    for session in &mut sessions {
        pollster::block_on(bootstrapper.load_model(session, &fetcher));
    }

    let mut app = TerminalApp::new(sessions);
    app.run()
}
