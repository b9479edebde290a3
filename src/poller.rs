/*!
    requesting side of the link: poll a remote module from a host

    replies carry no address, so each poll waits for its own reply before the next one is sent. Bytes already pending when a poll starts, such as a reply arriving after its timeout, are discarded.
*/

use std::{
    path::Path,
    pin::Pin,
    task::Poll,
    time::Duration,
    };
use serial2_tokio::SerialPort;
use tokio::io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt, ReadBuf};
use thiserror::Error;
use log::*;

use crate::{
    serial,
    protocol::{self, Sample, Target, FrameError},
    store::{Slot, AddressError},
    };


/// time allowed for a reply when not configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// error regarding a poll
#[derive(Error, Debug)]
pub enum Error {
    #[error("problem with uart bus: {0}")]
    Bus(#[from] std::io::Error),
    #[error("no reply arrived in expected time")]
    Timeout,
    #[error("malformed reply: {0}")]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// host polling a module over a byte stream
pub struct Poller<P> {
    port: P,
    timeout: Duration,
}

impl Poller<SerialPort> {
    /// poll the module on the given serial port file, at the given baud rate
    pub fn open(path: impl AsRef<Path>, rate: u32) -> Result<Self, std::io::Error> {
        Ok(Self::new(serial::open(path, rate)?))
    }
}
impl<P: AsyncRead + AsyncWrite + Unpin> Poller<P> {
    pub fn new(port: P) -> Self {
        Self {port, timeout: DEFAULT_TIMEOUT}
    }
    /// set the time allowed for each reply
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn into_inner(self) -> P {self.port}

    /// sample of an analog channel, by its 0-based index as in requests
    pub async fn read_analog(&mut self, index: u8) -> Result<Sample, Error> {
        let mut reply = [0; 2];
        self.exchange(Target::analog(index)?, &mut reply).await?;
        Ok(protocol::decode_analog(reply)?)
    }
    /// raw value of a discrete group, signals set are bits set
    pub async fn read_group(&mut self, group: u8, switcher: bool) -> Result<u8, Error> {
        let mut reply = [0; 1];
        self.exchange(Target::discrete(group, switcher)?, &mut reply).await?;
        Ok(protocol::decode_discrete(reply[0]))
    }
    /// one discrete signal by its 1-based bit number
    pub async fn read_bit(&mut self, bit: u16) -> Result<bool, Error> {
        let slot = Slot::from_bit(bit)?;
        let group = self.read_group(slot.group, false).await?;
        Ok(group & slot.mask() != 0)
    }

    async fn exchange(&mut self, target: Target, reply: &mut [u8]) -> Result<(), Error> {
        let request = protocol::encode_request(target);
        debug!("poll {:#04x}: {:?}", request, target);
        self.discard_pending()?;
        let port = &mut self.port;
        let exchange = async move {
            port.write_all(&[request]).await?;
            port.flush().await?;
            port.read_exact(reply).await?;
            Ok::<(), std::io::Error>(())
        };
        tokio::time::timeout(self.timeout, exchange).await
            .map_err(|_| Error::Timeout)??;
        Ok(())
    }
    /// drop received bytes that no poll is waiting for, without waiting for more
    fn discard_pending(&mut self) -> Result<(), std::io::Error> {
        let waker = std::task::Waker::noop();
        let mut context = std::task::Context::from_waker(waker);
        let mut buffer = [0; 16];
        loop {
            let mut pending = ReadBuf::new(&mut buffer);
            match Pin::new(&mut self.port).poll_read(&mut context, &mut pending) {
                Poll::Ready(Ok(())) if !pending.filled().is_empty() =>
                    warn!("discarding {} late bytes: {:02x?}", pending.filled().len(), pending.filled()),
                Poll::Ready(Err(error)) => return Err(error),
                _ => return Ok(()),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new()
            .expect("failed to create runtime")
            .block_on(future)
    }

    #[test]
    fn analog_poll() {
        block_on(async {
            let (near, mut far) = tokio::io::duplex(16);
            let mut poller = Poller::new(near);
            let module = async {
                let mut request = [0; 1];
                far.read_exact(&mut request).await.unwrap();
                assert_eq!(request, [0x84]);
                far.write_all(&[0xe8, 0x0f]).await.unwrap();
            };
            let (sample, ()) = tokio::join!(poller.read_analog(4), module);
            assert_eq!(sample.unwrap().value(), 1000);
        });
    }

    #[test]
    fn discrete_poll() {
        block_on(async {
            let (near, mut far) = tokio::io::duplex(16);
            let mut poller = Poller::new(near);
            let module = async {
                let mut request = [0; 2];
                far.read_exact(&mut request[.. 1]).await.unwrap();
                far.write_all(&[0b1111_1010]).await.unwrap();
                far.read_exact(&mut request[1 ..]).await.unwrap();
                far.write_all(&[0b1111_1010]).await.unwrap();
                request
            };
            let polls = async {
                (poller.read_group(40, true).await.unwrap(), poller.read_bit(137).await.unwrap())
            };
            let ((group, bit), requests) = tokio::join!(polls, module);
            assert_eq!(requests, [0x40 | 40, 40]);
            assert_eq!(group, 0b0000_0101);
            assert!(bit);
        });
    }

    #[test]
    fn bad_replies() {
        block_on(async {
            let (near, mut far) = tokio::io::duplex(16);
            let mut poller = Poller::new(near).with_timeout(Duration::from_millis(20));
            let module = async {
                far.read_exact(&mut [0; 1]).await.unwrap();
                far.write_all(&[0x28, 0x0f]).await.unwrap();
            };
            let (sample, ()) = tokio::join!(poller.read_analog(4), module);
            assert!(matches!(sample, Err(Error::Frame(FrameError::LowMarker(0x28)))));
            // nobody answers
            assert!(matches!(poller.read_analog(4).await, Err(Error::Timeout)));
            assert!(matches!(poller.read_analog(200).await, Err(Error::Address(AddressError::Index(200)))));
            assert!(matches!(poller.read_bit(0).await, Err(Error::Address(AddressError::Discrete(0)))));
        });
    }

    #[test]
    fn late_reply_is_discarded() {
        block_on(async {
            let (near, mut far) = tokio::io::duplex(16);
            let mut poller = Poller::new(near).with_timeout(Duration::from_millis(20));
            assert!(matches!(poller.read_analog(4).await, Err(Error::Timeout)));
            // reply to the timed out poll
            far.write_all(&[0xe8, 0x0f]).await.unwrap();

            let module = async {
                let mut requests = [0; 2];
                far.read_exact(&mut requests).await.unwrap();
                far.write_all(&[0xc3, 0x00]).await.unwrap();
                requests
            };
            let (sample, requests) = tokio::join!(poller.read_analog(5), module);
            assert_eq!(requests, [0x84, 0x85]);
            assert_eq!(sample.unwrap().value(), 3);
        });
    }
}
