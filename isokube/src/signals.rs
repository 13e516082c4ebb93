//! Termination signals while a private kube config exists.
//!
//! A terminal Ctrl-C reaches this process as well as kubectl. Dying from it
//! would skip removing the private kube config, so while a [`SignalGuard`]
//! is alive SIGINT, SIGTERM, SIGQUIT and SIGHUP are caught and passed on to
//! the running kubectl instead.

#[cfg(unix)]
mod imp {
    use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::iterator::{Handle, Signals};
    use tracing::{debug, info, warn};

    use crate::{Error, Result};

    pub const CAUGHT: [i32; 4] = [SIGINT, SIGTERM, SIGQUIT, SIGHUP];

    pub struct SignalGuard {
        handle: Handle,
        // 0 while no kubectl is running.
        child: Arc<AtomicU32>,
        // Last signal caught, 0 for none.
        received: Arc<AtomicI32>,
        thread: Option<JoinHandle<()>>,
    }

    impl SignalGuard {
        pub fn install() -> Result<Self> {
            let mut signals = Signals::new(CAUGHT).map_err(Error::Signals)?;
            let handle = signals.handle();
            let child = Arc::new(AtomicU32::new(0));
            let received = Arc::new(AtomicI32::new(0));

            let thread = {
                let child = child.clone();
                let received = received.clone();
                thread::spawn(move || {
                    for signal in signals.forever() {
                        received.store(signal, Ordering::SeqCst);

                        let pid = child.load(Ordering::SeqCst);
                        if pid == 0 {
                            info!(signal, "signal received, cleaning up");
                            continue;
                        }

                        debug!(signal, pid, "forwarding signal to kubectl");
                        // SAFETY: kill has no memory-safety preconditions.
                        if unsafe { libc::kill(pid as libc::pid_t, signal) } != 0 {
                            warn!(signal, pid, "could not forward signal");
                        }
                    }
                })
            };

            Ok(Self {
                handle,
                child,
                received,
                thread: Some(thread),
            })
        }

        /// Signals caught from now on go to `pid`.
        pub fn forward_to(&self, pid: u32) {
            self.child.store(pid, Ordering::SeqCst);
        }

        pub fn stop_forwarding(&self) {
            self.child.store(0, Ordering::SeqCst);
        }

        pub fn interrupted(&self) -> Option<i32> {
            match self.received.load(Ordering::SeqCst) {
                0 => None,
                signal => Some(signal),
            }
        }
    }

    impl Drop for SignalGuard {
        fn drop(&mut self) {
            self.handle.close();
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use crate::Result;

    pub struct SignalGuard;

    impl SignalGuard {
        pub fn install() -> Result<Self> {
            Ok(SignalGuard)
        }

        pub fn forward_to(&self, _pid: u32) {}

        pub fn stop_forwarding(&self) {}

        pub fn interrupted(&self) -> Option<i32> {
            None
        }
    }
}

pub use imp::SignalGuard;
