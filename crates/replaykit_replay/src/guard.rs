//! Offline network guard.
//!
//! A process-wide deny flag with RAII release. All outbound socket opens
//! in the workspace route through [`guarded_connect`]; while any guard is
//! installed, such attempts fail with `network_attempt_blocked`.
//! Installation and teardown are paired on every exit path, including
//! panics, because release happens in `Drop`.

use crate::error::{ReplayError, ReplayResult};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};

static ACTIVE_GUARDS: AtomicUsize = AtomicUsize::new(0);

/// RAII handle for the offline network deny guard. Guards nest; the deny
/// flag clears when the last one drops.
pub struct NetworkGuard(());

impl NetworkGuard {
    /// Install the guard.
    #[must_use]
    pub fn install() -> Self {
        ACTIVE_GUARDS.fetch_add(1, Ordering::SeqCst);
        Self(())
    }

    /// Whether any guard is currently installed.
    #[must_use]
    pub fn is_active() -> bool {
        ACTIVE_GUARDS.load(Ordering::SeqCst) > 0
    }
}

impl Drop for NetworkGuard {
    fn drop(&mut self) {
        ACTIVE_GUARDS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fail if the offline guard is active.
///
/// # Errors
///
/// Returns [`ReplayError::NetworkAttemptBlocked`] while a guard holds.
pub fn ensure_network_allowed(target: &str) -> ReplayResult<()> {
    if NetworkGuard::is_active() {
        tracing::error!(target, "outbound network attempt blocked during offline replay");
        return Err(ReplayError::NetworkAttemptBlocked {
            target: target.to_string(),
        });
    }
    Ok(())
}

/// Open an outbound TCP connection, honoring the offline guard.
///
/// Adapters wired through this helper trip the guard during replay
/// instead of silently reaching the network.
///
/// # Errors
///
/// Returns `network_attempt_blocked` while a guard holds, or an I/O error
/// from the connect itself.
pub fn guarded_connect(host: &str, port: u16) -> ReplayResult<TcpStream> {
    let target = format!("{host}:{port}");
    ensure_network_allowed(&target)?;
    TcpStream::connect((host, port)).map_err(|err| ReplayError::Io {
        target,
        message: err.to_string(),
    })
}

/// Run a closure with the offline guard installed. The guard is released
/// on all exit paths.
///
/// # Errors
///
/// Propagates the closure's error.
pub fn with_offline_guard<T>(operation: impl FnOnce() -> ReplayResult<T>) -> ReplayResult<T> {
    let _guard = NetworkGuard::install();
    operation()
}
