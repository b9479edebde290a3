/*!
    emulator and poller for a small uart remote I/O module

    The module exposes 128 analog channels of 10 bits and 48 groups of 8 discrete signals. Each poll is a single request byte and is answered with 2 bytes (analog) or 1 byte (discrete), see [protocol].

    - [store] holds the channel tables
    - [protocol] decodes requests and encodes replies, on both sides of the link
    - `responder` (feature `responder`) answers polls on any async uart, `no_std`
    - `poller` (feature `poller`) sends polls from a host and checks the replies
    - `loader` (feature `std`) fills a store from an initialization file
*/
#![cfg_attr(not(test), no_std)]
#[cfg(all(feature = "std", not(test)))]
extern crate std;

mod mutex;
mod utils;

pub mod protocol;
pub mod store;
#[cfg(feature = "std")]
pub mod loader;
#[cfg(feature = "responder")]
pub mod responder;
#[cfg(feature = "poller")]
pub mod serial;
#[cfg(feature = "poller")]
pub mod poller;
#[cfg(all(feature = "poller", feature = "responder"))]
pub mod host;

pub use mutex::{BusyMutex, BusyMutexGuard};
