use std::path::{Path, PathBuf};
use std::time::Duration;

use comicokrat::actions::{ActionTable, default_shortcuts};
use comicokrat::controls::{ChromeHost, Control};
use comicokrat::desktop::DesktopPlatform;
use comicokrat::layout::ZoomMode;
use comicokrat::navigation::ReadingDirection;
use comicokrat::platform::ViewportMetrics;
use comicokrat::sources::collect_page_sources;
use comicokrat::test_utils::test_helpers::{
    TestScenarioBuilder, capture_terminal_state, create_test_terminal,
};
use comicokrat::{App, Viewer, ViewerConfig, run_app_with_event_source};
use image::{Rgba, RgbaImage};

const SETTLE: Duration = Duration::from_secs(10);

fn write_book(dir: &Path, heights: &[u32]) {
    for (i, height) in heights.iter().enumerate() {
        let shade = 60 + 40 * i as u8;
        RgbaImage::from_pixel(120, *height, Rgba([shade, shade, 200, 255]))
            .save(dir.join(format!("{i:03}.png")))
            .unwrap();
    }
}

fn open_app(dir: &Path, export_dir: PathBuf) -> App {
    let sources = collect_page_sources(&[dir.to_path_buf()]);
    let platform = DesktopPlatform::new(ViewportMetrics::new(160, 90, 1.0));
    let viewer = Viewer::new(sources, ViewerConfig::default(), platform);
    let shortcuts = ActionTable::from_shortcuts(&default_shortcuts()).unwrap();
    let mut app = App::new(viewer, shortcuts, export_dir);
    app.start(None).unwrap();
    assert!(app.wait_until_settled(SETTLE).unwrap());
    app
}

#[test]
fn arrow_keys_page_through_a_decoded_book() {
    let book = tempfile::tempdir().unwrap();
    write_book(book.path(), &[160, 160, 160]);
    let mut app = open_app(book.path(), book.path().join("out"));
    assert_eq!(app.viewer.progress().loaded, 3);

    let mut terminal = create_test_terminal(60, 20);
    let mut events = TestScenarioBuilder::new()
        .next_page(2)
        .prev_page()
        .quit()
        .build();
    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.viewer.pointer(), 1);
    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("2 / 3"), "status line missing in:\n{screen}");
}

#[test]
fn typed_page_number_jumps_and_shortcuts_reach_the_viewer() {
    let book = tempfile::tempdir().unwrap();
    write_book(book.path(), &[160, 160, 160, 160]);
    let mut app = open_app(book.path(), book.path().join("out"));

    let mut terminal = create_test_terminal(60, 20);
    let mut events = TestScenarioBuilder::new()
        .go_to_page(4)
        .press_char('w')
        .press_char('m')
        .quit()
        .build();
    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.viewer.pointer(), 3);
    assert_eq!(app.viewer.state().zoom_mode, ZoomMode::FitWidth);
    assert_eq!(app.viewer.state().reading_direction, ReadingDirection::Manga);
}

#[test]
fn clicking_the_center_toggles_the_toolbar() {
    let book = tempfile::tempdir().unwrap();
    write_book(book.path(), &[160, 160]);
    let mut app = open_app(book.path(), book.path().join("out"));
    let before = app.viewer.platform().is_control_visible(Control::Toolbar);

    let mut terminal = create_test_terminal(60, 20);
    let mut events = TestScenarioBuilder::new().click(30, 5).quit().build();
    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_ne!(
        app.viewer.platform().is_control_visible(Control::Toolbar),
        before
    );
}

#[test]
fn step_onto_broken_page_is_dropped() {
    let book = tempfile::tempdir().unwrap();
    write_book(book.path(), &[160]);
    std::fs::write(book.path().join("001.png"), b"not a png").unwrap();
    let mut app = open_app(book.path(), book.path().join("out"));

    let mut terminal = create_test_terminal(60, 20);
    let mut events = TestScenarioBuilder::new().next_page(1).quit().build();
    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.viewer.pointer(), 0);
    assert_eq!(app.viewer.progress().loaded, 2);
}

#[test]
fn export_writes_every_chunk_of_a_tall_page() {
    let book = tempfile::tempdir().unwrap();
    write_book(book.path(), &[4000]);
    let out = book.path().join("out");
    let mut app = open_app(book.path(), out.clone());

    let written = app.export_current().unwrap();
    // Smart zoom keeps a long strip at actual size: 4000 rows, three chunks
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| p.starts_with(&out)));
    let total: u32 = written
        .iter()
        .map(|p| image::open(p).unwrap().height())
        .sum();
    assert_eq!(total, 4000);
    app.shutdown();
    assert!(app.viewer.is_destroyed());
}
