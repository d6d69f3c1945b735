//! Cooperative shutdown signal
//!
//! Checked as a flag once per poll cycle, and selectable in
//! `crossbeam_channel::select!` through [`Shutdown::done`]: the receiver
//! becomes ready (disconnected) once the signal fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender};

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
}

#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
    done: Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
            }),
            done: rx,
        }
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // Dropping the only sender wakes every select on `done`
        let mut trigger = self.inner.trigger.lock().unwrap_or_else(|e| e.into_inner());
        trigger.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Ready once cancelled; never yields a value
    pub fn done(&self) -> &Receiver<()> {
        &self.done
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::select;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_cancel_sets_flag_on_clones() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!other.is_cancelled());
        shutdown.cancel();
        shutdown.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_done_wakes_select() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.cancel();
        });

        let start = Instant::now();
        select! {
            recv(shutdown.done()) -> msg => assert!(msg.is_err()),
            default(Duration::from_secs(5)) => panic!("shutdown not observed"),
        }
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
