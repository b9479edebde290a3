use clap::Parser;
use std::{error::Error, path::PathBuf};
use log::*;

use uartrio::{
    host::{TokioBus, TokioDelay},
    loader,
    responder::Responder,
    serial,
    store::ChannelStore,
    };

/// discrete signals of the emulated crate, set at startup
const PRESET: [(u16, bool); 5] = [
    (137, true),   // 6TC101L01
    (106, true),   // 6TC102P01
    (152, true),   // 6TC104L01
    (150, false),  // 6TC105P01
    (153, true),   // 6TC106L01
];

/// Emulate a remote I/O module answering polls on a serial port
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Serial port the requester is connected to
    #[clap(long, default_value = "/dev/ttyUSB0")]
    port: PathBuf,

    /// Baud rate, 8 data bits, no parity, 1 stop bit
    #[clap(long, default_value_t = serial::DEFAULT_BAUD)]
    baud: u32,

    /// Initialization file for analog channels
    #[clap(long, default_value = "analog.txt")]
    values: PathBuf,

    /// Pause after each reply, in milliseconds
    #[clap(long, default_value_t = 2)]
    pacing_ms: u32,

    /// Set a discrete signal at startup, as BIT=1 or BIT=0 (repeatable)
    #[clap(long = "bit", value_parser = parse_bit)]
    bits: Vec<(u16, bool)>,

    /// Do not set the default discrete signals
    #[clap(long)]
    no_preset: bool,
}

fn parse_bit(text: &str) -> Result<(u16, bool), String> {
    let (bit, state) = text.split_once('=').ok_or("expected BIT=1 or BIT=0")?;
    let bit = bit.trim().parse().map_err(|_| format!("{:?} is not a bit number", bit))?;
    let on = match state.trim() {
        "1" => true,
        "0" => false,
        other => return Err(format!("{:?} is not 0 or 1", other)),
    };
    Ok((bit, on))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    let mut store = ChannelStore::new();
    // without initialization file the analog channels stay at zero
    if let Err(error) = loader::load(&args.values, &mut store) {
        error!("{}", error);
    }

    let mut bits = if args.no_preset {Vec::new()} else {PRESET.to_vec()};
    bits.extend(args.bits);
    for (bit, on) in bits {
        match store.set_discrete_bit(bit, on) {
            Ok(()) => debug!("discrete bit {} set to {}", bit, on),
            Err(error) => warn!("{}", error),
        }
    }

    info!("opening {:?} at {} baud", args.port, args.baud);
    let port = serial::open(&args.port, args.baud)?;
    let responder = Responder::new(TokioBus(port), TokioDelay, store)
        .with_pacing(args.pacing_ms.saturating_mul(1000));
    responder.run().await;
    Ok(())
}
