//! serial link settings shared by both sides

use std::path::Path;
use serial2_tokio::{SerialPort, CharSize, StopBits, Parity};


/// baud rate of the module when not configured otherwise
pub const DEFAULT_BAUD: u32 = 9600;

/// open a uart port in raw mode, 8 data bits, no parity, 1 stop bit
pub fn open(path: impl AsRef<Path>, rate: u32) -> Result<SerialPort, std::io::Error> {
    SerialPort::open(path, |mut settings: serial2_tokio::Settings| {
        settings.set_raw();
        settings.set_baud_rate(rate)?;
        settings.set_char_size(CharSize::Bits8);
        settings.set_stop_bits(StopBits::One);
        settings.set_parity(Parity::None);
        Ok(settings)
        })
}
