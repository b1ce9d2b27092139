//! The registry must wipe every outstanding buffer, from any thread.

use latebra_crypto_core::error::CryptoError;
use latebra_crypto_core::kdf::{derive_root, CostParameters};
use latebra_crypto_core::memory::{BufferState, WipeRegistry};
use std::sync::mpsc;
use std::thread;

#[test]
fn purge_wipes_derived_root_secrets() {
    let registry = WipeRegistry::new();
    let root = derive_root(
        &registry,
        b"password",
        b"label",
        &CostParameters { n: 4, r: 1, p: 1 },
    )
    .unwrap();

    assert_eq!(registry.purge(), 2);
    assert_eq!(root.key().state(), BufferState::Wiped);
    assert!(matches!(
        root.identifier().expose(),
        Err(CryptoError::BufferWiped)
    ));
}

#[test]
fn purge_waits_for_in_flight_reader() {
    let registry = WipeRegistry::new();
    let buf = registry.secret_from(&[0x5Au8; 64]).unwrap();
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let shared = &buf;
    thread::scope(|scope| {
        scope.spawn(move || {
            let guard = shared.expose().unwrap();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            // Contents are intact for the duration of the read.
            assert!(guard.iter().all(|&b| b == 0x5A));
        });

        held_rx.recv().unwrap();
        let purger = {
            let registry = registry.clone();
            scope.spawn(move || registry.purge())
        };
        release_tx.send(()).unwrap();
        assert_eq!(purger.join().unwrap(), 1);
    });

    assert!(matches!(buf.expose(), Err(CryptoError::BufferWiped)));
}

#[test]
fn buffers_allocated_after_purge_are_usable() {
    let registry = WipeRegistry::new();
    let _old = registry.secret_from(b"old").unwrap();
    registry.purge();

    let fresh = registry.secret_from(b"fresh").unwrap();
    assert_eq!(&*fresh.expose().unwrap(), b"fresh");
    assert_eq!(registry.outstanding(), 1);
}
