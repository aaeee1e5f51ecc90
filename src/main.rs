use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::{
    event::EnableMouseCapture,
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use comicokrat::desktop::DesktopPlatform;
use comicokrat::input::KeyboardEventSource;
use comicokrat::layout::ZoomMode;
use comicokrat::locator::{BookmarkLocator, Bookmarks};
use comicokrat::main_app::{App, run_app_with_event_source};
use comicokrat::navigation::ReadingDirection;
use comicokrat::panic_handler::{initialize_panic_handler, restore_terminal};
use comicokrat::settings::{Settings, bookmarks_path};
use comicokrat::sources::{collect_page_sources, display_name};
use comicokrat::viewer::Viewer;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "comicokrat")]
#[command(about = "Read comics and image sequences in the terminal", version)]
struct Args {
    /// Page images or directories of page images, in reading order
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Zoom mode: smart, fit-width, fit-window, original-size or manual
    #[arg(short, long)]
    zoom_mode: Option<ZoomMode>,

    /// Read right to left
    #[arg(short, long)]
    manga: bool,

    /// Pages preloaded ahead of the starting page before going back
    #[arg(long)]
    forward_buffer: Option<i32>,

    /// Virtual viewport in pixels, e.g. 1280x720
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<(u32, u32)>,

    /// Device pixel density of the viewport
    #[arg(long)]
    density: Option<f32>,

    /// 1-based page to open at
    #[arg(short, long)]
    page: Option<usize>,

    /// Directory for exported chunks
    #[arg(short, long, default_value = "comicokrat-export")]
    output: PathBuf,

    /// Render the starting page, export its chunks and exit
    #[arg(long)]
    export: bool,

    #[arg(long, default_value = "comicokrat.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn parse_viewport(value: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width = w.trim().parse::<u32>().map_err(|e| format!("width: {e}"))?;
    let height = h.trim().parse::<u32>().map_err(|e| format!("height: {e}"))?;
    if width == 0 || height == 0 {
        return Err("viewport dimensions must be positive".to_string());
    }
    Ok((width, height))
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(mode) = args.zoom_mode {
        settings.zoom_mode = mode;
    }
    if args.manga {
        settings.reading_direction = ReadingDirection::Manga;
    }
    if let Some(buffer) = args.forward_buffer {
        settings.forward_buffer = buffer;
    }
    if let Some((width, height)) = args.viewport {
        settings.viewport.width = width;
        settings.viewport.height = height;
    }
    if let Some(density) = args.density {
        settings.viewport.pixel_density = density;
    }
}

fn build_app(args: &Args, settings: &Settings) -> Result<App> {
    let sources = collect_page_sources(&args.sources);
    if sources.is_empty() {
        bail!("No page images found in {:?}", args.sources);
    }
    info!("Opening {} pages", sources.len());

    let config = settings.viewer_config(display_name(&args.sources));
    let platform = DesktopPlatform::new(settings.viewport.metrics());
    let page_count = sources.len();
    let mut viewer = Viewer::new(sources, config, platform);

    if settings.remember_position {
        let path = bookmarks_path();
        let bookmarks = Bookmarks::load_or_ephemeral(path.as_deref().and_then(|p| p.to_str()));
        let book = book_key(&args.sources);
        viewer = viewer.with_locator(Box::new(BookmarkLocator::new(bookmarks, book, page_count)));
    }

    let shortcuts = settings
        .action_table()
        .context("Invalid shortcut in settings")?;
    Ok(App::new(viewer, shortcuts, args.output.clone()))
}

/// Bookmarks are keyed by the absolute path of the first argument
fn book_key(paths: &[PathBuf]) -> String {
    paths
        .first()
        .map(|p| {
            p.canonicalize()
                .unwrap_or_else(|_| p.clone())
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default()
}

fn run_export(app: &mut App, page: Option<usize>) -> Result<()> {
    app.start(page)?;
    if !app.wait_for_current_page(EXPORT_TIMEOUT)? {
        bail!("Timed out decoding page {}", app.viewer.pointer() + 1);
    }
    let written = app.export_current()?;
    for path in &written {
        println!("{}", path.display());
    }
    app.shutdown();
    Ok(())
}

fn run_terminal(app: &mut App, page: Option<usize>) -> Result<()> {
    initialize_panic_handler();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let res = app
        .start(page)
        .and_then(|_| run_app_with_event_source(&mut terminal, app, &mut KeyboardEventSource));

    app.shutdown();
    restore_terminal();
    terminal.show_cursor()?;
    res
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {:?}", args.log_file))?,
    )?;
    info!("Starting comicokrat");

    let mut settings = Settings::load();
    apply_overrides(&mut settings, &args);

    let mut app = build_app(&args, &settings)?;
    let res = if args.export {
        run_export(&mut app, args.page)
    } else {
        run_terminal(&mut app, args.page)
    };

    if let Err(err) = &res {
        error!("Application error: {err:#}");
    }
    info!("Shutting down comicokrat");
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_argument_parses() {
        assert_eq!(parse_viewport("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_viewport("800X600"), Ok((800, 600)));
        assert!(parse_viewport("1280").is_err());
        assert!(parse_viewport("0x10").is_err());
    }

    #[test]
    fn cli_overrides_settings() {
        let args = Args::parse_from([
            "comicokrat",
            "--manga",
            "--zoom-mode",
            "fit-width",
            "--viewport",
            "640x480",
            "book",
        ]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &args);
        assert_eq!(settings.reading_direction, ReadingDirection::Manga);
        assert_eq!(settings.zoom_mode, ZoomMode::FitWidth);
        assert_eq!(settings.viewport.width, 640);
        assert_eq!(settings.viewport.height, 480);
    }
}
