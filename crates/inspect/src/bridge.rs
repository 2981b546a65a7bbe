use std::cell::{Cell, RefCell};
use std::rc::Rc;

use layers::{LayerGroup, ListenerId, ListenerScope, MapEngine, PointerEvent, PointerEventKind};
use tracing::{debug, trace};

use crate::error::InspectError;
use crate::hover::{HoverFeature, HoverStore};
use crate::pointer::{ClaimToken, PointerAffordance};

type EnterCallback = Rc<dyn Fn(HoverFeature)>;
type LeaveCallback = Rc<dyn Fn()>;

/// Turns engine pointer notifications into `enter(feature)` / `leave()`
/// signals, one subscription per layer group.
#[derive(Clone)]
pub struct PointerBridge {
    engine: Rc<dyn MapEngine>,
    affordance: Rc<PointerAffordance>,
}

impl PointerBridge {
    pub fn new(engine: Rc<dyn MapEngine>, affordance: Rc<PointerAffordance>) -> Self {
        Self { engine, affordance }
    }

    pub fn engine(&self) -> &Rc<dyn MapEngine> {
        &self.engine
    }

    /// Registers move and leave listeners for `group`.
    ///
    /// Every layer of the group must already be registered with the engine.
    pub fn subscribe(&self, group: LayerGroup) -> Result<HoverSubscription, InspectError> {
        if let Some(missing) = group.layers().iter().find(|l| !self.engine.has_layer(l)) {
            return Err(InspectError::UnknownLayer(missing.clone()));
        }

        let claim = self.affordance.register(group.to_string());
        let shared = Rc::new(Shared {
            active: Cell::new(true),
            claim,
            affordance: self.affordance.clone(),
            on_enter: RefCell::new(None),
            on_leave: RefCell::new(None),
        });

        let subscription = HoverSubscription {
            engine: self.engine.clone(),
            group: group.clone(),
            shared: shared.clone(),
            listeners: RefCell::new(Vec::new()),
            teardown_hooks: RefCell::new(Vec::new()),
        };

        let scope = ListenerScope::Layers(group.layers().to_vec());

        let s = shared.clone();
        let moved = self.engine.on(
            PointerEventKind::Move,
            scope.clone(),
            Rc::new(move |event: &PointerEvent| s.handle_move(event)),
        )?;
        subscription.listeners.borrow_mut().push(moved);

        let s = shared;
        // On failure `subscription` drops and unregisters the move listener.
        let left = self.engine.on(
            PointerEventKind::Leave,
            scope,
            Rc::new(move |_event: &PointerEvent| s.handle_leave()),
        )?;
        subscription.listeners.borrow_mut().push(left);

        debug!(group = %group, "hover subscription registered");
        Ok(subscription)
    }
}

struct Shared {
    active: Cell<bool>,
    claim: ClaimToken,
    affordance: Rc<PointerAffordance>,
    on_enter: RefCell<Option<EnterCallback>>,
    on_leave: RefCell<Option<LeaveCallback>>,
}

impl Shared {
    fn handle_move(&self, event: &PointerEvent) {
        if !self.active.get() {
            return;
        }
        // No matched features is not a leave; only the exit notification is.
        let Some(feature) = event.features.first() else {
            return;
        };
        self.affordance.claim(self.claim);

        let Some(properties) = feature.properties.clone() else {
            return;
        };
        let position = feature.point_position().unwrap_or(event.lng_lat);

        let callback = self.on_enter.borrow().clone();
        if let Some(cb) = callback {
            trace!(lon = position.lon, lat = position.lat, "pointer enter");
            cb(HoverFeature {
                position,
                properties,
            });
        }
    }

    fn handle_leave(&self) {
        if !self.active.get() {
            return;
        }
        self.affordance.release(self.claim);

        let callback = self.on_leave.borrow().clone();
        if let Some(cb) = callback {
            trace!("pointer leave");
            cb();
        }
    }
}

/// Live hover listeners of one layer group.
///
/// Dropping the subscription tears it down.
pub struct HoverSubscription {
    engine: Rc<dyn MapEngine>,
    group: LayerGroup,
    shared: Rc<Shared>,
    listeners: RefCell<Vec<ListenerId>>,
    teardown_hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl HoverSubscription {
    pub fn group(&self) -> &LayerGroup {
        &self.group
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.get()
    }

    /// Replaces the enter callback.
    pub fn on_enter(&self, cb: impl Fn(HoverFeature) + 'static) {
        *self.shared.on_enter.borrow_mut() = Some(Rc::new(cb));
    }

    /// Replaces the leave callback.
    pub fn on_leave(&self, cb: impl Fn() + 'static) {
        *self.shared.on_leave.borrow_mut() = Some(Rc::new(cb));
    }

    /// Runs `hook` once when the subscription is torn down.
    pub fn on_teardown(&self, hook: impl FnOnce() + 'static) {
        if self.is_active() {
            self.teardown_hooks.borrow_mut().push(Box::new(hook));
        } else {
            hook();
        }
    }

    /// Routes enter/leave into `store` and empties it on teardown.
    pub fn bind(&self, store: &HoverStore) {
        let s = store.downgrade();
        self.on_enter(move |feature| {
            if let Some(store) = s.upgrade() {
                store.set(feature);
            }
        });
        let s = store.downgrade();
        self.on_leave(move || s.clear());
        let s = store.downgrade();
        self.on_teardown(move || s.clear());
    }

    /// Unregisters exactly the listeners this subscription added.
    ///
    /// Idempotent. Safe to call from inside one of the subscription's own
    /// callbacks; no callback runs after it returns.
    pub fn teardown(&self) {
        if !self.shared.active.replace(false) {
            return;
        }
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for id in listeners {
            self.engine.off(id);
        }
        self.shared.on_enter.borrow_mut().take();
        self.shared.on_leave.borrow_mut().take();
        self.shared.affordance.unregister(self.shared.claim);

        let hooks = std::mem::take(&mut *self.teardown_hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
        debug!(group = %self.group, "hover subscription torn down");
    }
}

impl Drop for HoverSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}
