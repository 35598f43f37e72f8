//! Auto-mount task
//!
//! Looks for the marker attribute on a bounded schedule: once the document
//! is ready, again after a short delay for late markup, then at a fixed
//! interval until something is mounted or the attempts run out. Wrap the
//! task with [`futures::future::abortable`] to get a disconnect hook.

use std::future::Future;
use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::bootstrap::{Bootstrapper, Document, Mounter, ReadyState};

/// Sleeps on the host's timer
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Auto-mount schedule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoMountPolicy {
    /// Delay before the second attempt
    pub retry_delay: Duration,

    /// Interval between later attempts
    pub poll_interval: Duration,

    /// Number of attempts after the retry
    pub max_polls: u32,
}

impl Default for AutoMountPolicy {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(250),
            max_polls: 40,
        }
    }
}

/// Run the auto-mount schedule to completion
///
/// `ready` resolves on the document-ready event and is only awaited while
/// the document is still loading. Returns the container this task mounted,
/// or `None` if the page was mounted elsewhere or no marker showed up.
pub async fn auto_mount<D, M, T>(
    bootstrapper: &Bootstrapper<D, M>,
    ready: impl Future<Output = ()>,
    timer: &T,
    policy: &AutoMountPolicy,
) -> Option<D::Element>
where
    D: Document,
    M: Mounter<D::Element>,
    T: Timer,
{
    if bootstrapper.document().ready_state() == ReadyState::Loading {
        ready.await;
    }

    if let Some(container) = bootstrapper.auto_init() {
        return Some(container);
    }

    let delays = std::iter::once(policy.retry_delay)
        .chain(std::iter::repeat_n(policy.poll_interval, policy.max_polls as usize));

    for delay in delays {
        if bootstrapper.is_initialized() {
            return None;
        }
        timer.sleep(delay).await;
        if let Some(container) = bootstrapper.auto_init() {
            return Some(container);
        }
    }

    tracing::debug!(attempts = policy.max_polls + 2, "No paywall marker found, auto-mount stopped");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::testing::{FakeDocument, RecordingMounter};
    use crate::bootstrap::MARKER_ATTRIBUTE;
    use futures::channel::oneshot;
    use futures::future::abortable;

    struct TokioTimer;

    impl Timer for TokioTimer {
        fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
            Box::pin(tokio::time::sleep(duration))
        }
    }

    fn policy() -> AutoMountPolicy {
        AutoMountPolicy {
            retry_delay: Duration::from_millis(5),
            poll_interval: Duration::from_millis(5),
            max_polls: 4,
        }
    }

    fn setup(document: &FakeDocument) -> (Bootstrapper<FakeDocument, RecordingMounter>, RecordingMounter) {
        let mounter = RecordingMounter::default();
        (Bootstrapper::new(document.clone(), mounter.clone()), mounter)
    }

    #[tokio::test]
    async fn test_mounts_marker_immediately_and_rerun_is_no_op() {
        let document = FakeDocument::default();
        let marked = document.insert("", Some((MARKER_ATTRIBUTE, "foo")));
        let (boot, mounter) = setup(&document);

        let mounted = auto_mount(&boot, async {}, &TokioTimer, &policy()).await;
        assert_eq!(mounted, Some(marked));
        assert_eq!(document.id_of(marked), "foo");

        let rerun = auto_mount(&boot, async {}, &TokioTimer, &policy()).await;
        assert!(rerun.is_none());
        assert_eq!(boot.container(), Some(marked));
        assert_eq!(mounter.mounts(), vec![marked]);
    }

    #[tokio::test]
    async fn test_picks_up_late_markup() {
        let document = FakeDocument::default();
        let (boot, mounter) = setup(&document);

        let late = async {
            tokio::time::sleep(Duration::from_millis(12)).await;
            document.insert("", Some((MARKER_ATTRIBUTE, "late")))
        };
        let policy = policy();
        let (mounted, inserted) = tokio::join!(auto_mount(&boot, async {}, &TokioTimer, &policy), late);

        assert_eq!(mounted, Some(inserted));
        assert_eq!(mounter.mounts(), vec![inserted]);
    }

    #[tokio::test]
    async fn test_waits_for_document_ready() {
        let document = FakeDocument::loading();
        let marked = document.insert("", Some((MARKER_ATTRIBUTE, "foo")));
        let (boot, mounter) = setup(&document);
        let (tx, rx) = oneshot::channel::<()>();

        let ready = async {
            let _ = rx.await;
        };
        let fire = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(mounter.mounts().is_empty());
            document.set_ready_state(ReadyState::Interactive);
            tx.send(()).unwrap();
        };
        let policy = policy();
        let (mounted, ()) = tokio::join!(auto_mount(&boot, ready, &TokioTimer, &policy), fire);

        assert_eq!(mounted, Some(marked));
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_attempts() {
        let document = FakeDocument::default();
        let (boot, mounter) = setup(&document);

        let mounted = auto_mount(&boot, async {}, &TokioTimer, &policy()).await;

        assert!(mounted.is_none());
        assert!(mounter.mounts().is_empty());
    }

    #[tokio::test]
    async fn test_stops_when_mounted_explicitly() {
        let document = FakeDocument::default();
        let (boot, mounter) = setup(&document);

        let explicit = async {
            tokio::time::sleep(Duration::from_millis(7)).await;
            boot.init(None).unwrap();
            document.insert("", Some((MARKER_ATTRIBUTE, "foo")));
        };
        let policy = policy();
        let (mounted, ()) = tokio::join!(auto_mount(&boot, async {}, &TokioTimer, &policy), explicit);

        assert!(mounted.is_none());
        assert_eq!(mounter.mounts().len(), 1);
    }

    #[tokio::test]
    async fn test_stops_when_another_copy_mounted() {
        let document = FakeDocument::default();
        let (boot, mounter) = setup(&document);

        let other_copy = async {
            tokio::time::sleep(Duration::from_millis(7)).await;
            document.mounted_elsewhere();
            document.insert("", Some((MARKER_ATTRIBUTE, "foo")));
        };
        let policy = policy();
        let (mounted, ()) = tokio::join!(auto_mount(&boot, async {}, &TokioTimer, &policy), other_copy);

        assert!(mounted.is_none());
        assert!(mounter.mounts().is_empty());
    }

    #[tokio::test]
    async fn test_abort_handle_disconnects() {
        let document = FakeDocument::default();
        let (boot, mounter) = setup(&document);

        let policy = policy();
        let (task, handle) = abortable(auto_mount(&boot, async {}, &TokioTimer, &policy));
        handle.abort();
        document.insert("", Some((MARKER_ATTRIBUTE, "foo")));

        assert!(task.await.is_err());
        assert!(mounter.mounts().is_empty());
    }
}
