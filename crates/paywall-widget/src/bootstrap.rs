//! Widget Bootstrapper
//!
//! Mounts the paywall into the host page exactly once, either on an explicit
//! `init` call or when the page carries the marker attribute. The document
//! and the UI mount are traits so the policy can run without a browser.
//!
//! "Once" is page-wide: a flag on the host window records the mount, so a
//! second copy of the widget loaded into the same page leaves it alone.

use std::cell::OnceCell;

/// Marker attribute that requests auto-mounting
pub const MARKER_ATTRIBUTE: &str = "data-daily-breathing-paywall";

/// Container id used when none is given
pub const DEFAULT_CONTAINER_ID: &str = "daily-breathing-paywall";

/// Document loading phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// The slice of the host document the bootstrapper needs
pub trait Document {
    type Element: Clone;

    fn ready_state(&self) -> ReadyState;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// Create a `<div>` with this id and append it to the body
    fn create_container(&self, id: &str) -> Option<Self::Element>;

    /// First element carrying `attribute`
    fn find_marked(&self, attribute: &str) -> Option<Self::Element>;

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Element id, empty when unset
    fn id(&self, element: &Self::Element) -> String;

    fn set_id(&self, element: &Self::Element, id: &str);

    /// Whether any widget instance has mounted into this page
    fn initialized_flag(&self) -> bool;

    fn set_initialized_flag(&self);
}

/// Mounts the UI tree into a container
pub trait Mounter<E> {
    fn mount(&self, container: &E);
}

/// One-shot mount state for a page
pub struct Bootstrapper<D: Document, M> {
    document: D,
    mounter: M,
    container: OnceCell<D::Element>,
}

impl<D, M> Bootstrapper<D, M>
where
    D: Document,
    M: Mounter<D::Element>,
{
    pub fn new(document: D, mounter: M) -> Self {
        Self {
            document,
            mounter,
            container: OnceCell::new(),
        }
    }

    pub const fn document(&self) -> &D {
        &self.document
    }

    /// Mounted by this instance or by another copy on the same page
    pub fn is_initialized(&self) -> bool {
        self.container.get().is_some() || self.document.initialized_flag()
    }

    /// The mounted container, once there is one
    pub fn container(&self) -> Option<D::Element> {
        self.container.get().cloned()
    }

    /// Mount into `container_id` (or the default id)
    ///
    /// When already mounted, returns the existing container without mounting
    /// again. If another copy of the widget mounted the page, nothing is
    /// mounted and the element with this id (if any) is returned. `None`
    /// means there is no container to hand back.
    pub fn init(&self, container_id: Option<&str>) -> Option<D::Element> {
        if let Some(container) = self.container.get() {
            tracing::warn!("Daily Breathing Paywall already initialized");
            return Some(container.clone());
        }

        let id = container_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CONTAINER_ID);

        if self.document.initialized_flag() {
            tracing::warn!(container_id = id, "Daily Breathing Paywall already initialized on this page");
            return self.document.element_by_id(id);
        }

        let Some(container) = self
            .document
            .element_by_id(id)
            .or_else(|| self.document.create_container(id))
        else {
            tracing::error!(container_id = id, "Could not create paywall container");
            return None;
        };

        // Claim the slot before mounting so a re-entrant call sees it taken
        let container = self.container.get_or_init(|| container).clone();
        self.document.set_initialized_flag();
        self.mounter.mount(&container);
        tracing::info!(container_id = id, "Daily Breathing Paywall mounted");
        Some(container)
    }

    /// Mount into the marked element, if there is one and nothing is mounted
    ///
    /// The element keeps its own id when it has one; otherwise it takes the
    /// marker's value (or the default id) as its id.
    pub fn auto_init(&self) -> Option<D::Element> {
        if self.is_initialized() {
            return None;
        }

        let marked = self.document.find_marked(MARKER_ATTRIBUTE)?;
        let existing = self.document.id(&marked);

        let id = if existing.is_empty() {
            let id = self
                .document
                .attribute(&marked, MARKER_ATTRIBUTE)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTAINER_ID.to_string());
            self.document.set_id(&marked, &id);
            id
        } else {
            existing
        };

        tracing::debug!(container_id = %id, "Found paywall marker");
        self.init(Some(&id))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeDocument, RecordingMounter};
    use super::*;

    fn bootstrapper(document: &FakeDocument) -> (Bootstrapper<FakeDocument, RecordingMounter>, RecordingMounter) {
        let mounter = RecordingMounter::default();
        (Bootstrapper::new(document.clone(), mounter.clone()), mounter)
    }

    #[test]
    fn test_init_creates_default_container() {
        let document = FakeDocument::default();
        let (boot, mounter) = bootstrapper(&document);

        let container = boot.init(None).unwrap();
        assert_eq!(document.id_of(container), DEFAULT_CONTAINER_ID);
        assert!(document.is_in_body(container));
        assert_eq!(mounter.mounts(), vec![container]);
    }

    #[test]
    fn test_init_reuses_existing_element() {
        let document = FakeDocument::default();
        let existing = document.insert("pricing", None);
        let (boot, _) = bootstrapper(&document);

        assert_eq!(boot.init(Some("pricing")), Some(existing));
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        let document = FakeDocument::default();
        let (boot, mounter) = bootstrapper(&document);

        let first = boot.init(Some("one")).unwrap();
        let second = boot.init(Some("two")).unwrap();

        assert_eq!(first, second);
        assert_eq!(mounter.mounts().len(), 1);
        assert!(document.element_by_id("two").is_none());
    }

    #[test]
    fn test_init_sets_page_flag() {
        let document = FakeDocument::default();
        let (boot, _) = bootstrapper(&document);

        assert!(!document.initialized_flag());
        boot.init(None).unwrap();
        assert!(document.initialized_flag());
    }

    #[test]
    fn test_second_widget_copy_does_not_mount() {
        let document = FakeDocument::default();
        let (first, first_mounter) = bootstrapper(&document);
        let (second, second_mounter) = bootstrapper(&document);

        let container = first.init(None).unwrap();
        assert!(second.is_initialized());
        assert_eq!(second.init(None), Some(container));
        assert!(second.init(Some("elsewhere")).is_none());

        assert_eq!(first_mounter.mounts(), vec![container]);
        assert!(second_mounter.mounts().is_empty());
        assert!(second.container().is_none());
        assert!(document.element_by_id("elsewhere").is_none());
    }

    #[test]
    fn test_auto_init_skips_page_mounted_elsewhere() {
        let document = FakeDocument::default();
        document.insert("", Some((MARKER_ATTRIBUTE, "foo")));
        document.mounted_elsewhere();
        let (boot, mounter) = bootstrapper(&document);

        assert!(boot.auto_init().is_none());
        assert!(mounter.mounts().is_empty());
    }

    #[test]
    fn test_auto_init_uses_marker_value() {
        let document = FakeDocument::default();
        let marked = document.insert("", Some((MARKER_ATTRIBUTE, "foo")));
        let (boot, mounter) = bootstrapper(&document);

        assert_eq!(boot.auto_init(), Some(marked));
        assert_eq!(document.id_of(marked), "foo");
        assert!(boot.auto_init().is_none());
        assert_eq!(boot.container(), Some(marked));
        assert_eq!(mounter.mounts(), vec![marked]);
    }

    #[test]
    fn test_auto_init_keeps_existing_id() {
        let document = FakeDocument::default();
        let marked = document.insert("host-slot", Some((MARKER_ATTRIBUTE, "foo")));
        let (boot, _) = bootstrapper(&document);

        assert_eq!(boot.auto_init(), Some(marked));
        assert_eq!(document.id_of(marked), "host-slot");
    }

    #[test]
    fn test_auto_init_empty_marker_uses_default_id() {
        let document = FakeDocument::default();
        let marked = document.insert("", Some((MARKER_ATTRIBUTE, "")));
        let (boot, _) = bootstrapper(&document);

        boot.auto_init().unwrap();
        assert_eq!(document.id_of(marked), DEFAULT_CONTAINER_ID);
    }

    #[test]
    fn test_auto_init_without_marker() {
        let document = FakeDocument::default();
        document.insert("unrelated", None);
        let (boot, mounter) = bootstrapper(&document);

        assert!(boot.auto_init().is_none());
        assert!(!boot.is_initialized());
        assert!(mounter.mounts().is_empty());
    }
}
