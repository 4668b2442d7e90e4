//! Progress reporting and cancellation for batch runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives human-readable status lines during a batch run.
///
/// `progress` is the number of files finished so far when the message marks
/// a completed file. Called from worker threads.
pub trait BatchObserver: Sync {
    fn on_log(&self, message: &str, progress: Option<usize>);
}

impl<F> BatchObserver for F
where
    F: Fn(&str, Option<usize>) + Sync,
{
    fn on_log(&self, message: &str, progress: Option<usize>) {
        self(message, progress)
    }
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_log(&self, _message: &str, _progress: Option<usize>) {}
}

/// Shared cancellation signal, checked before each file starts
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_observer() {
        let lines = Mutex::new(Vec::new());
        let observer = |m: &str, p: Option<usize>| lines.lock().unwrap().push((m.to_string(), p));
        observer.on_log("a", None);
        observer.on_log("b", Some(1));
        assert_eq!(
            lines.into_inner().unwrap(),
            vec![("a".to_string(), None), ("b".to_string(), Some(1))]
        );
    }

    #[test]
    fn test_cancel_flag_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
