//! glasscon - translucent console mirror
//!
//! Features:
//! - Mirrors a character grid into a pixel canvas drawn over a backdrop
//! - Patches only the damaged cells, full repaint when too much changed
//! - Blinking cursor and a scrollbar gutter for the scrollback
//! - Keystrokes forwarded to the mirrored console
//! - Demo mode previewing the composed frame in the terminal

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{self, Event, MouseButton, MouseEventKind};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use glasscon::config::{ColorScheme, Config};
use glasscon::core::grid::GridSource;
use glasscon::core::memory::MemoryGrid;
use glasscon::render::background::save_ppm;
use glasscon::render::canvas::Canvas;
use glasscon::render::compositor::Surface;
use glasscon::render::glyph::BlockGlyphs;
use glasscon::ui::{KeyMapper, TerminalSurface};
use glasscon::{Mirror, TickOutcome};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    demo: bool,
    dump_frame: Option<PathBuf>,
    command: Vec<String>,
}

fn print_version() {
    eprintln!("glasscon {}", VERSION);
}

fn print_help() {
    eprintln!(
        r#"glasscon {} - translucent console mirror

USAGE:
    glasscon [OPTIONS] [-- COMMAND [ARGS...]]

OPTIONS:
    -c, --config <PATH>     Use this config file instead of ~/.glasscon/config.toml
        --demo              Mirror a built-in demo grid in this terminal
        --dump-frame <PATH> Write the last composed frame as a PPM image on exit
        --schemes           List the built-in color schemes
    -v, --version           Print version
    -h, --help              Print help

On Windows the default mode allocates a new console, runs COMMAND (cmd.exe
by default) in it and mirrors it until the command exits. Elsewhere the demo
mode is always used.

KEYS (demo mode):
    Ctrl+Q                  Quit
    Mouse click             Scroll via the scrollbar gutter

Logs are written to ~/.glasscon/glasscon.log (filter with RUST_LOG)."#,
        VERSION
    );
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--schemes" => {
                for name in ColorScheme::list() {
                    println!("{}", name);
                }
                std::process::exit(0);
            }
            "-c" | "--config" => {
                let path = iter.next().ok_or("--config requires a path")?;
                args.config_path = Some(PathBuf::from(path));
            }
            "--demo" => args.demo = true,
            "--dump-frame" => {
                let path = iter.next().ok_or("--dump-frame requires a path")?;
                args.dump_frame = Some(PathBuf::from(path));
            }
            "--" => {
                args.command = iter.by_ref().collect();
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(args)
}

/// Send tracing output to `~/.glasscon/glasscon.log`
fn init_logging() {
    let Ok(dir) = Config::data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("glasscon.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_config(args: &Args) -> Config {
    match &args.config_path {
        Some(path) => Config::load_or_default(path),
        None => {
            if let Err(e) = Config::write_default_if_missing() {
                warn!("Could not write default config: {}", e);
            }
            Config::load()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'glasscon --help' for usage");
            std::process::exit(2);
        }
    };

    init_logging();
    info!("glasscon {} starting", VERSION);

    let config = load_config(&args);

    #[cfg(windows)]
    if !args.demo {
        return run_console(&args, &config);
    }

    run_demo(&args, &config)
}

fn dump_frame(path: Option<&Path>, frame: &Canvas) -> anyhow::Result<()> {
    if let Some(path) = path {
        save_ppm(frame, path).with_context(|| format!("writing frame to {}", path.display()))?;
        info!("Frame written to {}", path.display());
    }
    Ok(())
}

/// Demo grid: a welcome screen above some scrollback
fn demo_grid() -> MemoryGrid {
    let mut grid = MemoryGrid::new(80, 25, 200);
    grid.set_title("glasscon demo");

    grid.set_pen(8, 0);
    for line in 0..150 {
        grid.write_str(&format!("scrollback line {:3}\r\n", line));
    }

    grid.set_pen(15, 1);
    grid.write_str(" glasscon \r\n");
    grid.set_pen(7, 0);
    grid.write_str("\r\nType to echo text. Click the right gutter to scroll.\r\n");
    grid.write_str("Ctrl+Q quits.\r\n\r\n");
    for color in 0..16u8 {
        grid.set_pen(color, if color == 0 { 7 } else { 0 });
        grid.write_str("##");
    }
    grid.set_pen(10, 0);
    grid.write_str("\r\n\r\n> ");
    grid
}

fn run_demo(args: &Args, config: &Config) -> anyhow::Result<()> {
    if !args.command.is_empty() {
        warn!("Demo mode ignores the command {:?}", args.command);
    }
    let mut mirror = Mirror::new(
        demo_grid(),
        config.palette(),
        BlockGlyphs,
        config.background_provider(),
        config.mirror_options(),
    );

    let mut surface = TerminalSurface::stdout().context("querying terminal size")?;
    surface.init().context("initializing terminal")?;

    let result = run_loop(&mut mirror, &mut surface, config.render.tick_ms);

    if let Err(e) = surface.cleanup() {
        warn!("Terminal cleanup failed: {}", e);
    }
    result?;

    dump_frame(args.dump_frame.as_deref(), surface.frame())?;
    info!("Demo finished: {:?}", mirror.stats());
    Ok(())
}

/// Tick the mirror on a fixed period, handling terminal events in between
fn run_loop<S: GridSource>(
    mirror: &mut Mirror<S>,
    surface: &mut TerminalSurface,
    tick_ms: u64,
) -> anyhow::Result<()> {
    let period = Duration::from_millis(tick_ms.max(1));
    let mut next_tick = Instant::now();

    loop {
        let now = Instant::now();
        if now >= next_tick {
            if mirror.tick(surface)? == TickOutcome::Closed {
                return Ok(());
            }
            let (width, height) = mirror.screen_size();
            surface.resize_frame(width, height);
            next_tick = now + period;
            continue;
        }

        if !event::poll(next_tick - now)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) => {
                if KeyMapper::is_quit(&key) {
                    mirror.close();
                    continue;
                }
                for input in KeyMapper::map(&key) {
                    mirror.send_key(input);
                }
            }
            Event::Mouse(mouse) => {
                if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                    let (x, y) = surface.to_pixel(mouse.column, mouse.row);
                    mirror.on_click(x, y);
                }
            }
            Event::Resize(cols, rows) => {
                surface.set_terminal_size(cols, rows)?;
                surface.present()?;
            }
            _ => {}
        }
    }
}

/// Mirror a freshly allocated console running `args.command`
#[cfg(windows)]
fn run_console(args: &Args, config: &Config) -> anyhow::Result<()> {
    use glasscon::core::console::ConsoleGrid;
    use glasscon::render::compositor::MemorySurface;

    let grid = ConsoleGrid::allocate().context("allocating console")?;

    let command = if args.command.is_empty() {
        vec![String::from("cmd.exe")]
    } else {
        args.command.clone()
    };
    let mut child = std::process::Command::new(&command[0])
        .args(&command[1..])
        .spawn()
        .with_context(|| format!("starting {}", command[0]))?;
    info!("Started {:?} (pid {})", command, child.id());

    let mut mirror = Mirror::new(
        grid,
        config.palette(),
        BlockGlyphs,
        config.background_provider(),
        config.mirror_options(),
    );
    let mut surface = MemorySurface::new(0, 0);
    let period = Duration::from_millis(config.render.tick_ms.max(1));

    loop {
        if let Some(status) = child.try_wait()? {
            info!("Command exited: {}", status);
            mirror.close();
        }
        if mirror.tick(&mut surface)? == TickOutcome::Closed {
            break;
        }
        let (width, height) = mirror.screen_size();
        surface.resize(width, height);
        surface.take_blits();
        std::thread::sleep(period);
    }

    dump_frame(args.dump_frame.as_deref(), surface.frame())?;
    info!("Console mirror finished: {:?}", mirror.stats());
    Ok(())
}
