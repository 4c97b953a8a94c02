use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use super::indicator::{self, Indicator};
use super::Logger;
use crate::display::DisplaySink;
use crate::{Error, Result};

/// Install a ctrl-c handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

pub(crate) fn boot_screen() -> Vec<String> {
    vec![
        format!("sensorlog v{}", env!("CARGO_PKG_VERSION")),
        "starting sensors".to_string(),
        String::new(),
        String::new(),
    ]
}

pub(crate) fn shutdown_screen() -> Vec<String> {
    vec![
        "sensorlog".to_string(),
        "offline".to_string(),
        String::new(),
        String::new(),
    ]
}

pub(crate) fn storage_fault_screen(err: &Error) -> Vec<String> {
    let detail = match err {
        Error::StorageExhausted { filename, .. } => filename.clone(),
        _ => "see log".to_string(),
    };
    vec![
        "STORAGE FAULT".to_string(),
        detail,
        "check card, then".to_string(),
        "restart".to_string(),
    ]
}

pub(super) fn render_boot(display: &mut dyn DisplaySink) -> Result<()> {
    display.set_backlight(true)?;
    display.show(&boot_screen())
}

/// Show the shutdown message before exiting the daemon loop.
pub(super) fn render_shutdown(display: &mut dyn DisplaySink) -> Result<()> {
    display.show(&shutdown_screen())
}

/// Terminal state after the storage medium stopped accepting writes. Blinks
/// until `running` clears and never returns to the polling loop.
pub(crate) fn fatal_halt(
    err: &Error,
    display: &mut dyn DisplaySink,
    led: &mut dyn Indicator,
    running: &AtomicBool,
    logger: &Logger,
    period: Duration,
) {
    logger.error(format!("{err}; halting until restarted"));
    if let Err(show_err) = display.show(&storage_fault_screen(err)) {
        logger.warn(format!("could not show fault screen: {show_err}"));
    }
    while running.load(Ordering::SeqCst) {
        indicator::fatal_blink(led, period);
    }
    led.set(false);
}
