/*!
    module side of the link: answer every poll from the channel store

    the responder runs on any async uart implementing [embedded_io_async], so the same code serves polls from a microcontroller or, through [crate::host], from a host serial port.
*/

use embedded_io_async::{Read, Write, ReadExactError};
use embedded_hal_async::delay::DelayNs;
use log::*;

use crate::{
    mutex::*,
    protocol::{self, Target},
    store::{ChannelStore, DISCRETE_GROUPS},
    };


/// default pause after each reply, in microseconds
pub const DEFAULT_PACING: u32 = 2_000;

/// emulated module, answering polls received on its bus
pub struct Responder<B, D> {
    store: BusyMutex<ChannelStore>,
    control: BusyMutex<ResponderControl<B, D>>,
}
struct ResponderControl<B, D> {
    bus: B,
    delay: D,
    /// pause after each reply so the requester is never flooded, in microseconds
    pacing: u32,
}
/// reason a request got no reply
enum Fault<E> {
    /// the bus will not deliver any more bytes
    Closed,
    Receive(E),
    Transmit(E),
}

impl<B: Read + Write, D: DelayNs> Responder<B, D> {
    pub fn new(bus: B, delay: D, store: ChannelStore) -> Self {
        Self {
            store: BusyMutex::from(store),
            control: BusyMutex::from(ResponderControl {
                bus,
                delay,
                pacing: DEFAULT_PACING,
            }),
        }
    }
    /// set the pause after each reply, in microseconds
    pub fn with_pacing(mut self, pacing: u32) -> Self {
        self.control.get_mut().pacing = pacing;
        self
    }
    /// access the channels, replies wait while the guard is held
    pub async fn lock(&self) -> BusyMutexGuard<'_, ChannelStore> {self.store.lock().await}
    pub fn try_lock(&self) -> Option<BusyMutexGuard<'_, ChannelStore>> {self.store.try_lock()}

    /**
        answer polls until the bus is closed

        only one run can be active at a time, any other call returns immediately
    */
    pub async fn run(&self) {
        let Some(mut control) = self.control.try_lock()
            else {return};
        info!("responding to polls");
        loop {
            match control.respond(&self.store).await {
                Ok(()) => {},
                Err(Fault::Closed) => {
                    info!("bus closed, stop responding");
                    return
                },
                // nothing was sent, so no need to wait before listening again
                Err(Fault::Receive(error)) => {
                    warn!("failed receiving request: {:?}", error);
                    continue
                },
                Err(Fault::Transmit(error)) => warn!("failed transmitting reply: {:?}", error),
            }
            let pacing = control.pacing;
            control.delay.delay_us(pacing).await;
        }
    }
}

impl<B: Read + Write, D> ResponderControl<B, D> {
    /// receive one request and transmit its reply
    async fn respond(&mut self, store: &BusyMutex<ChannelStore>) -> Result<(), Fault<B::Error>> {
        let mut request = [0; 1];
        self.bus.read_exact(&mut request).await.map_err(|error| match error {
            ReadExactError::UnexpectedEof => Fault::Closed,
            ReadExactError::Other(error) => Fault::Receive(error),
            })?;
        let target = protocol::decode_request(request[0]);
        debug!("request {:#04x}: {:?}", request[0], target);
        if let Target::Discrete {group, switcher} = target {
            if usize::from(group.value()) >= DISCRETE_GROUPS
                {debug!("group {} is not in module, replying empty", group.value())}
            if switcher
                {debug!("switcher bit is reserved, ignored")}
        }
        // the store is only locked for the lookup, never while the bus is busy
        let reply = store.lock().await.answer(target);
        self.bus.write_all(&reply.to_bytes()).await.map_err(Fault::Transmit)?;
        self.bus.flush().await.map_err(Fault::Transmit)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt;
    use std::{
        cell::RefCell,
        collections::VecDeque,
        rc::Rc,
        vec::Vec,
        };
    use embedded_io_async::{ErrorType, ErrorKind};

    #[derive(Debug)]
    struct ScriptError;
    impl fmt::Display for ScriptError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {write!(f, "scripted failure")}
    }
    impl core::error::Error for ScriptError {}
    impl embedded_io_async::Error for ScriptError {
        fn kind(&self) -> ErrorKind {ErrorKind::Other}
    }

    /// bus receiving a fixed sequence of bytes or failures, then closing
    struct ScriptBus {
        input: VecDeque<Option<u8>>,
        output: Rc<RefCell<Vec<u8>>>,
        failing_writes: usize,
    }
    impl ScriptBus {
        fn new(input: impl IntoIterator<Item=Option<u8>>) -> (Self, Rc<RefCell<Vec<u8>>>) {
            let output = Rc::new(RefCell::new(Vec::new()));
            (Self {input: input.into_iter().collect(), output: output.clone(), failing_writes: 0}, output)
        }
    }
    impl ErrorType for ScriptBus {
        type Error = ScriptError;
    }
    impl Read for ScriptBus {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ScriptError> {
            if buf.is_empty()
                {return Ok(0)}
            match self.input.pop_front() {
                None => Ok(0),
                Some(Some(byte)) => {buf[0] = byte; Ok(1)},
                Some(None) => Err(ScriptError),
            }
        }
    }
    impl Write for ScriptBus {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, ScriptError> {
            if self.failing_writes > 0 {
                self.failing_writes -= 1;
                return Err(ScriptError);
            }
            self.output.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        async fn flush(&mut self) -> Result<(), ScriptError> {Ok(())}
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    fn store() -> ChannelStore {
        let mut store = ChannelStore::new();
        store.set_analog(5, 1000).unwrap();
        store.set_discrete_bit(41, true).unwrap();
        store.set_discrete_bit(137, true).unwrap();
        store
    }
    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new()
            .expect("failed to create runtime")
            .block_on(future)
    }

    #[test]
    fn replies_in_order() {
        let (bus, output) = ScriptBus::new([Some(0x84), Some(40), Some(0x85), Some(0x40 | 40), Some(50)]);
        let responder = Responder::new(bus, NoDelay, store());
        block_on(responder.run());
        assert_eq!(output.borrow().as_slice(), &[
            0xe8, 0x0f,
            0b1111_1010,
            0xc0, 0x00,
            0b1111_1010,
            0xff,
            ]);
    }

    #[test]
    fn read_failure_skips_reply() {
        let (bus, output) = ScriptBus::new([None, Some(40), None, None, Some(0x84)]);
        let responder = Responder::new(bus, NoDelay, store());
        block_on(responder.run());
        assert_eq!(output.borrow().as_slice(), &[0b1111_1010, 0xe8, 0x0f]);
    }

    #[test]
    fn write_failure_is_not_fatal() {
        let (mut bus, output) = ScriptBus::new([Some(40), Some(0x84)]);
        bus.failing_writes = 1;
        let responder = Responder::new(bus, NoDelay, store()).with_pacing(0);
        block_on(responder.run());
        assert_eq!(output.borrow().as_slice(), &[0xe8, 0x0f]);
    }

    #[test]
    fn replies_follow_updates() {
        let (bus, output) = ScriptBus::new([Some(0x84)]);
        let responder = Responder::new(bus, NoDelay, store());
        responder.try_lock().unwrap().set_analog(5, 3).unwrap();
        block_on(responder.run());
        assert_eq!(output.borrow().as_slice(), &[0xc3, 0x00]);
    }
}
