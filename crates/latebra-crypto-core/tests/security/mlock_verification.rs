//! Verify that `mlock` status is reported and that core dumps are
//! properly disabled.

use latebra_crypto_core::memory::{disable_core_dumps, BufferState, WipeRegistry};

#[test]
fn secret_buffer_reports_mlock_status() {
    let registry = WipeRegistry::new();
    let buf = registry.secret_from(b"mlock test data").unwrap();
    // mlock can legitimately fail in containers with low limits; either
    // outcome is fine as long as the buffer stays usable.
    let state = buf.state();
    assert!(matches!(state, BufferState::Locked | BufferState::LockFailed));
    assert_eq!(&*buf.expose().unwrap(), b"mlock test data");
    eprintln!("mlock state: {state:?}");
}

#[cfg(target_os = "linux")]
#[test]
fn mlock_increases_vmlck_on_linux() {
    let vmlck_before = read_vmlck_kb();

    let registry = WipeRegistry::new();
    let buf = registry.alloc(65536).unwrap();

    if buf.is_mlocked() {
        let vmlck_after = read_vmlck_kb();
        assert!(
            vmlck_after >= vmlck_before,
            "VmLck did not increase after mlock: before={vmlck_before}KB, after={vmlck_after}KB"
        );
    } else {
        eprintln!("mlock failed (likely insufficient quota), skipping VmLck check");
    }
}

#[cfg(target_os = "linux")]
fn read_vmlck_kb() -> u64 {
    let status =
        std::fs::read_to_string("/proc/self/status").expect("failed to read /proc/self/status");
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmLck:") {
            let trimmed = rest.trim().trim_end_matches(" kB").trim();
            return trimmed.parse().unwrap_or(0);
        }
    }
    0
}

#[cfg(unix)]
#[test]
fn disable_core_dumps_sets_rlimit_zero() {
    disable_core_dumps().expect("disable_core_dumps should succeed");
    disable_core_dumps().expect("second call should also succeed");
}
