//! poller and responder talking through an in-memory pipe instead of a serial line

#![cfg(all(feature = "poller", feature = "responder"))]

use std::{
    sync::Arc,
    time::Duration,
    };
use futures_concurrency::future::Race;
use tokio::io::DuplexStream;

use uartrio::{
    host::{TokioBus, TokioDelay},
    loader,
    poller::Poller,
    responder::Responder,
    store::ChannelStore,
    };


type Module = Responder<TokioBus<DuplexStream>, TokioDelay>;

fn test<T, F>(store: ChannelStore, test: T)
where
    T: FnOnce(Arc<Module>, Poller<DuplexStream>) -> F,
    F: Future,
{
    let _ = env_logger::builder().is_test(true).try_init();
    tokio::runtime::Runtime::new()
    .expect("failed to create runtime")
    .block_on(async move {
        let (near, far) = tokio::io::duplex(64);
        let module = Arc::new(Responder::new(TokioBus(far), TokioDelay, store).with_pacing(100));
        let poller = Poller::new(near).with_timeout(Duration::from_secs(1));
        (
            async {
                tokio::time::timeout(Duration::from_secs(10), test(module.clone(), poller))
                .await.expect("aborted test because took too long");
            },
            async {
                module.run().await;
            },
        ).race().await;
    });
}

fn crate_store() -> ChannelStore {
    let mut store = ChannelStore::new();
    store.set_analog(5, 1000).unwrap();
    store.set_analog(128, 77).unwrap();
    for (bit, on) in [(137, true), (106, true), (152, true), (150, false), (153, true)] {
        store.set_discrete_bit(bit, on).unwrap();
    }
    store
}


#[test]
fn polls_stored_values() {
    test(crate_store(), |_module, mut poller| async move {
        // address 5 of the store is index 4 on the wire
        assert_eq!(poller.read_analog(4).await.unwrap().value(), 1000);
        assert_eq!(poller.read_analog(127).await.unwrap().value(), 77);
        assert_eq!(poller.read_analog(5).await.unwrap().value(), 0);

        // bits 137 and 41 would share group 40, only 137 is set
        assert_eq!(poller.read_group(40, false).await.unwrap(), 0b0000_0100);
        assert_eq!(poller.read_group(40, true).await.unwrap(), 0b0000_0100);
        for bit in [137, 106, 152, 153] {
            assert!(poller.read_bit(bit).await.unwrap(), "bit {} should be set", bit);
        }
        assert!(!poller.read_bit(150).await.unwrap());
        assert!(!poller.read_bit(1).await.unwrap());

        // groups beyond the module's table read as empty
        assert_eq!(poller.read_group(50, false).await.unwrap(), 0);
    });
}

#[test]
fn polls_loaded_file() {
    let mut store = ChannelStore::new();
    let summary = loader::load_from("\
        1 1023  # full scale\n\
        2 1024  // wraps to zero\n\
        bad line\n\
        64 512\n".as_bytes(), &mut store).unwrap();
    assert_eq!(summary.applied, 3);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, 3);

    test(store, |_module, mut poller| async move {
        assert_eq!(poller.read_analog(0).await.unwrap().value(), 1023);
        assert_eq!(poller.read_analog(1).await.unwrap().value(), 0);
        assert_eq!(poller.read_analog(63).await.unwrap().value(), 512);
    });
}

#[test]
fn values_updated_while_running() {
    test(ChannelStore::new(), |module, mut poller| async move {
        for value in [0, 1, 63, 64, 700, 1023, 2047] {
            module.lock().await.set_analog(1, value).unwrap();
            assert_eq!(u32::from(poller.read_analog(0).await.unwrap().value()), value & 0x3ff);
        }

        module.lock().await.set_discrete_bit(384, true).unwrap();
        assert!(poller.read_bit(384).await.unwrap());
        assert_eq!(poller.read_group(47, false).await.unwrap(), 0b1000_0000);

        module.lock().await.set_discrete_bit(384, false).unwrap();
        assert!(!poller.read_bit(384).await.unwrap());
    });
}

#[test]
fn single_run() {
    test(crate_store(), |module, mut poller| async move {
        // the bus is already served, this returns at once
        module.run().await;
        assert_eq!(poller.read_analog(4).await.unwrap().value(), 1000);
    });
}
