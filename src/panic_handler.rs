use crossterm::{
    event::DisableMouseCapture,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use std::io::{self, Write};
use std::panic;

/// Install a panic hook that puts the terminal back before the report is
/// printed, and records the panic in the log file.
pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        log::error!("Panic at {location}: {}", panic_payload(panic_info));

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

fn panic_payload(info: &panic::PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Restore terminal to a clean state: raw mode off, main screen, mouse
/// capture released, cursor visible.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    let _ = execute!(io::stderr(), crossterm::cursor::Show);
    let _ = writeln!(io::stderr());
}
