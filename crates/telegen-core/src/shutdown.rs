//! Graceful shutdown on SIGINT/SIGTERM

use std::io;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio_util::sync::CancellationToken;

/// Exit code used when a second signal forces the process down
pub const FORCED_EXIT_CODE: i32 = 130;

/// Cancel `token` on the first SIGINT/SIGTERM; exit on the second.
///
/// Signals are read on a dedicated thread, so the token can be cancelled
/// even while every runtime worker is busy.
pub fn install_signal_handler(token: CancellationToken) -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("telegen-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if token.is_cancelled() {
                    eprintln!("Received second signal, exiting");
                    std::process::exit(FORCED_EXIT_CODE);
                }
                let name = if signal == SIGINT { "SIGINT" } else { "SIGTERM" };
                log::info!("Received {name}, shutting down (repeat to force)");
                token.cancel();
            }
        })?;
    Ok(())
}
