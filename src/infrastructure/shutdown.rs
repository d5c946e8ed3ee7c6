// Shutdown signal - SIGINT/SIGTERM raise a flag the dashboard loop checks each tick
use signal_hook::consts::{SIGINT, SIGTERM};
use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Exit status used when a second signal arrives before the loop has stopped.
const FORCED_EXIT_STATUS: i32 = 130;

/// The first SIGINT/SIGTERM sets the returned flag. A second one terminates
/// the process, so a sample source stuck in a blocking read can still be killed.
pub fn install() -> io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        // Must be registered first: it has to see the flag before this signal sets it.
        signal_hook::flag::register_conditional_shutdown(signal, FORCED_EXIT_STATUS, Arc::clone(&flag))?;
        signal_hook::flag::register(signal, Arc::clone(&flag))?;
    }
    Ok(flag)
}
