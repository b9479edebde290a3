use clap::Parser;
use std::{error::Error, path::PathBuf, time::Duration};
use log::*;

use uartrio::{
    poller::Poller,
    serial,
    };

/// Poll channels of a remote I/O module on a serial port
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Serial port the module is connected to
    #[clap(long, default_value = "/dev/ttyUSB0")]
    port: PathBuf,

    /// Baud rate, 8 data bits, no parity, 1 stop bit
    #[clap(long, default_value_t = serial::DEFAULT_BAUD)]
    baud: u32,

    /// Time allowed for each reply, in milliseconds
    #[clap(long, default_value_t = 100)]
    timeout_ms: u64,

    /// 0-based analog index to read (repeatable)
    #[clap(long)]
    analog: Vec<u8>,

    /// 0-based discrete group to read (repeatable)
    #[clap(long)]
    group: Vec<u8>,

    /// 1-based discrete bit to read (repeatable)
    #[clap(long)]
    bit: Vec<u16>,

    /// Set the reserved switcher bit in group requests
    #[clap(long)]
    switcher: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    info!("opening {:?} at {} baud", args.port, args.baud);
    let mut poller = Poller::open(&args.port, args.baud)?
        .with_timeout(Duration::from_millis(args.timeout_ms));

    for index in args.analog {
        match poller.read_analog(index).await {
            Ok(sample) => println!("analog {}: {}", index, sample.value()),
            Err(error) => error!("analog {}: {}", index, error),
        }
    }
    for group in args.group {
        match poller.read_group(group, args.switcher).await {
            Ok(raw) => println!("group {}: {:#010b}", group, raw),
            Err(error) => error!("group {}: {}", group, error),
        }
    }
    for bit in args.bit {
        match poller.read_bit(bit).await {
            Ok(on) => println!("bit {}: {}", bit, u8::from(on)),
            Err(error) => error!("bit {}: {}", bit, error),
        }
    }
    Ok(())
}
