//! Message injector: enqueue one control message on the broker queue.
//!
//! ```text
//! astrid-msg p pulsar freq=220 amp=0.5     # play
//! astrid-msg s pulsar 7                    # stop voice 7
//! astrid-msg k sequencer                   # shut the host down
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use astrid_core::{now_seconds, Message, MessageKind};
use astrid_ipc::{queue, Counter, Paths};
use clap::Parser;

#[derive(Parser)]
#[command(name = "astrid-msg", about = "Send a control message to the Astrid host")]
struct Args {
    /// Message type: p play, t trigger, l load, s stop voice, k shutdown
    msgtype: char,

    /// Target instrument name
    instrument: String,

    /// Message parameters (for stop: the voice id)
    params: Vec<String>,

    /// Seconds from now to schedule the message; omit for immediate
    #[arg(long)]
    delay: Option<f64>,

    /// Root directory of the running host
    #[arg(long, default_value = "/tmp")]
    root: PathBuf,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let paths = Paths::new(args.root);
    let mut msg = Message::from_cli(args.msgtype, &args.instrument, &args.params)?;

    if let Some(delay) = args.delay {
        msg.timestamp = now_seconds() + delay;
    }

    // Stop and shutdown carry their ids already; everything else draws a
    // fresh voice id from the counter the sequencer owns.
    if !matches!(msg.kind, MessageKind::StopVoice | MessageKind::Shutdown) {
        let mut counter = Counter::attach(&paths.voice_counter())?;
        msg.voice_id = counter.read_and_increment()?;
    }

    queue::send(&paths, &msg)?;
    tracing::debug!("enqueued {:?} for {} as voice {}", msg.kind, msg.instrument_name, msg.voice_id);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("astrid-msg: {err}");
            ExitCode::FAILURE
        }
    }
}
