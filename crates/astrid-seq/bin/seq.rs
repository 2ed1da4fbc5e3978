//! Sequencer binary. One per machine; owns the voice counter and the
//! broker queue.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use astrid_ipc::Paths;
use astrid_seq::Sequencer;

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_shutdown(_sig: libc::c_int) {
    // Only the flag: everything else happens back on the main thread.
    RUNNING.store(false, Ordering::Release);
}

fn install_signal_handlers() {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        let handler: extern "C" fn(libc::c_int) = handle_shutdown;
        action.sa_sigaction = handler as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        // SA_RESTART keeps queue reads out of EINTR churn.
        action.sa_flags = libc::SA_RESTART;

        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
        libc::sigaction(libc::SIGTERM, &action, std::ptr::null_mut());
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    install_signal_handlers();

    let root = std::env::args().nth(1).unwrap_or_else(|| "/tmp".to_string());
    let paths = Paths::new(root);

    let sequencer = match Sequencer::start(paths) {
        Ok(sequencer) => sequencer,
        Err(err) => {
            tracing::error!("could not start sequencer: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("astrid-seq running, ^C to stop");
    while RUNNING.load(Ordering::Acquire) && !sequencer.workers_finished() {
        std::thread::sleep(Duration::from_millis(1));
    }

    // Signal path: push the in-band shutdown so the feeder unblocks.
    if RUNNING.load(Ordering::Acquire) {
        tracing::info!("workers finished, exiting");
    } else if let Err(err) = sequencer.shutdown() {
        tracing::error!("shutdown message failed: {err}");
    }
    match sequencer.join() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("sequencer exited with error: {err}");
            ExitCode::FAILURE
        }
    }
}
