/*!
    run the [Responder](crate::responder::Responder) on a host

    tokio streams (serial ports, pipes, sockets) are adapted to the async uart traits the responder expects, and tokio timers provide its pacing.
*/

use core::fmt;
use std::time::Duration;
use embedded_io_async::{ErrorType, ErrorKind, Read, Write};
use embedded_hal_async::delay::DelayNs;
use tokio::io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt};


/// tokio stream seen as an uart bus
pub struct TokioBus<T>(pub T);

/// io error raised by the stream under a [TokioBus]
#[derive(Debug)]
pub struct BusError(pub std::io::Error);

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl core::error::Error for BusError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.0)
    }
}
impl embedded_io_async::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => ErrorKind::Interrupted,
            std::io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidData => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        }
    }
}

impl<T> ErrorType for TokioBus<T> {
    type Error = BusError;
}
impl<T: AsyncRead + Unpin> Read for TokioBus<T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        self.0.read(buf).await.map_err(BusError)
    }
}
impl<T: AsyncWrite + Unpin> Write for TokioBus<T> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, BusError> {
        self.0.write(buf).await.map_err(BusError)
    }
    async fn flush(&mut self) -> Result<(), BusError> {
        self.0.flush().await.map_err(BusError)
    }
}

/// pacing delay driven by the tokio timer
#[derive(Copy, Clone, Debug, Default)]
pub struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(Duration::from_nanos(ns.into())).await
    }
}
