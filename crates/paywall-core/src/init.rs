//! Single-flight lazy initialization
//!
//! An [`InitCell`] is either uninitialized, in progress (one pending future
//! that every concurrent caller awaits), or ready with the resolved value.
//! A failed attempt leaves the cell uninitialized so a later call can try
//! again.

use std::future::Future;

use tokio::sync::OnceCell;

/// Per-adapter initialization state
#[derive(Debug)]
pub struct InitCell<T> {
    cell: OnceCell<T>,
}

impl<T> Default for InitCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InitCell<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the ready value, running `init` only if no value exists yet
    ///
    /// Callers that arrive while `init` is in flight wait for it instead of
    /// starting a second one.
    pub async fn ensure_initialized<E, F, Fut>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_init() {
        let cell = Arc::new(InitCell::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let attempt = |cell: Arc<InitCell<u32>>, calls: Arc<AtomicUsize>| async move {
            cell.ensure_initialized(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, ()>(7)
            })
            .await
            .copied()
        };

        let (a, b, c) = tokio::join!(
            attempt(cell.clone(), calls.clone()),
            attempt(cell.clone(), calls.clone()),
            attempt(cell.clone(), calls.clone()),
        );

        assert_eq!((a, b, c), (Ok(7), Ok(7), Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_can_be_retried() {
        let cell = InitCell::<&str>::new();

        let first = cell.ensure_initialized(|| async { Err("boom") }).await;
        assert_eq!(first, Err("boom"));
        assert!(!cell.is_initialized());

        let second = cell.ensure_initialized(|| async { Ok::<_, &str>("ready") }).await;
        assert_eq!(second.copied(), Ok("ready"));
        assert!(cell.is_initialized());
    }
}
