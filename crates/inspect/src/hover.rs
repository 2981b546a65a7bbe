use std::cell::RefCell;
use std::rc::{Rc, Weak};

use foundation::arena::Arena;
use foundation::geo::LngLat;
use foundation::handles::Handle;
use layers::Properties;
use tracing::trace;

/// The feature currently under inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverFeature {
    pub position: LngLat,
    pub properties: Properties,
}

type Watcher = Rc<dyn Fn(Option<&HoverFeature>)>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WatchId(Handle);

#[derive(Default)]
struct StoreInner {
    slot: RefCell<Option<HoverFeature>>,
    watchers: RefCell<Arena<Watcher>>,
}

/// Single-slot store: one inspected feature, or none.
///
/// The slot only changes through [`HoverStore::set`] and [`HoverStore::clear`];
/// watchers run synchronously after every change, in registration order.
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct HoverStore {
    inner: Rc<StoreInner>,
}

impl std::fmt::Debug for HoverStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoverStore")
            .field("current", &*self.inner.slot.borrow())
            .finish_non_exhaustive()
    }
}

impl HoverStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<HoverFeature> {
        self.inner.slot.borrow().clone()
    }

    pub fn is_present(&self) -> bool {
        self.inner.slot.borrow().is_some()
    }

    /// Replaces the slot unconditionally (last enter wins).
    pub fn set(&self, feature: HoverFeature) {
        trace!(lon = feature.position.lon, lat = feature.position.lat, "hover set");
        *self.inner.slot.borrow_mut() = Some(feature);
        self.notify();
    }

    pub fn clear(&self) {
        let previous = self.inner.slot.borrow_mut().take();
        if previous.is_some() {
            trace!("hover cleared");
            self.notify();
        }
    }

    pub fn watch(&self, watcher: impl Fn(Option<&HoverFeature>) + 'static) -> WatchId {
        WatchId(self.inner.watchers.borrow_mut().insert(Rc::new(watcher)))
    }

    pub fn unwatch(&self, id: WatchId) -> bool {
        self.inner.watchers.borrow_mut().remove(id.0).is_some()
    }

    pub fn downgrade(&self) -> WeakHoverStore {
        WeakHoverStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn notify(&self) {
        // Watchers may re-enter the store (e.g. a popup closing itself), so
        // neither the slot nor the watcher list stays borrowed while they run.
        let snapshot = self.current();
        let watchers: Vec<Watcher> = self
            .inner
            .watchers
            .borrow()
            .iter()
            .map(|(_, w)| w.clone())
            .collect();
        for watcher in watchers {
            watcher(snapshot.as_ref());
        }
    }
}

/// Non-owning reference to a [`HoverStore`], for callbacks the store itself
/// keeps alive.
#[derive(Clone)]
pub struct WeakHoverStore {
    inner: Weak<StoreInner>,
}

impl WeakHoverStore {
    pub fn upgrade(&self) -> Option<HoverStore> {
        self.inner.upgrade().map(|inner| HoverStore { inner })
    }

    /// Clears the store if it is still alive.
    pub fn clear(&self) {
        if let Some(store) = self.upgrade() {
            store.clear();
        }
    }
}
