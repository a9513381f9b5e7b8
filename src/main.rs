use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use log::LevelFilter;
use ratatui::DefaultTerminal;
use simplelog::WriteLogger;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tui_choropleth::app::App;
use tui_choropleth::config::AppConfig;
use tui_choropleth::ui;

const DEFAULT_CONFIG: &str = "choropleth.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration; defaults are used when the default file is absent
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file (overrides the config)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_or_default(path, true)?,
        None => AppConfig::load_or_default(Path::new(DEFAULT_CONFIG), false)?,
    };

    init_logging(&config, &cli)?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, config);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(ref e) = result {
        log::error!("exiting: {:#}", e);
    }
    result
}

/// The terminal owns stdout/stderr, so logs go to a file
fn init_logging(config: &AppConfig, cli: &Cli) -> Result<()> {
    let level_name = cli.log_level.as_deref().unwrap_or(&config.log.level);
    let level = LevelFilter::from_str(level_name)
        .with_context(|| format!("Invalid log level: {:?}", level_name))?;
    let path = cli.log_file.as_ref().unwrap_or(&config.log.file);
    let file = File::create(path).with_context(|| format!("Failed to create log file: {:?}", path))?;

    WriteLogger::init(level, simplelog::Config::default(), file).context("Failed to initialize logger")?;
    log::info!("starting with {} metrics, boundaries {}", config.metrics.len(), config.boundaries);
    Ok(())
}

/// Handle mouse events for panning, zooming and popups
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        MouseEventKind::Down(MouseButton::Right) => {
            if let Some(popup) = app.open_popup_at(mouse.column, mouse.row) {
                log::debug!("popup: {}", popup);
            }
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: AppConfig) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width, size.height);
    app.start();

    loop {
        app.poll_loads();

        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    // Selectors
                    KeyCode::Tab => app.focus_next(),
                    KeyCode::BackTab => app.focus_prev(),
                    KeyCode::Char(']') => app.step_selection(true),
                    KeyCode::Char('[') => app.step_selection(false),

                    // Pan with hjkl or arrow keys
                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                    // Zoom
                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    KeyCode::Char('f') | KeyCode::Char('F') => app.fit_to_layer(),
                    KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
                    KeyCode::Char('r') | KeyCode::Char('R') => app.reload(),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
