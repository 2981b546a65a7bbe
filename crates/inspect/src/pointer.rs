use std::cell::{Cell, RefCell};
use std::rc::Rc;

use foundation::arena::Arena;
use foundation::handles::Handle;
use layers::{Cursor, MapEngine};
use tracing::trace;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClaimToken(Handle);

#[derive(Debug)]
struct Claimant {
    label: String,
    claimed: bool,
}

/// Arbitrates the map's cursor between concurrently mounted layer groups.
///
/// The cursor shows the pointer icon while at least one registered group
/// holds a claim, and reverts to the default once every claim is released.
pub struct PointerAffordance {
    engine: Rc<dyn MapEngine>,
    claimants: RefCell<Arena<Claimant>>,
    shown: Cell<Cursor>,
}

impl PointerAffordance {
    pub fn new(engine: Rc<dyn MapEngine>) -> Self {
        Self {
            engine,
            claimants: RefCell::new(Arena::new()),
            shown: Cell::new(Cursor::Default),
        }
    }

    pub fn register(&self, label: impl Into<String>) -> ClaimToken {
        ClaimToken(self.claimants.borrow_mut().insert(Claimant {
            label: label.into(),
            claimed: false,
        }))
    }

    /// Drops the registration and its claim, if any.
    pub fn unregister(&self, token: ClaimToken) {
        self.claimants.borrow_mut().remove(token.0);
        self.refresh();
    }

    pub fn claim(&self, token: ClaimToken) {
        self.set_claimed(token, true);
    }

    pub fn release(&self, token: ClaimToken) {
        self.set_claimed(token, false);
    }

    pub fn cursor(&self) -> Cursor {
        self.shown.get()
    }

    /// Labels of the groups currently holding a claim.
    pub fn claimants(&self) -> Vec<String> {
        self.claimants
            .borrow()
            .iter()
            .filter(|(_, c)| c.claimed)
            .map(|(_, c)| c.label.clone())
            .collect()
    }

    fn set_claimed(&self, token: ClaimToken, claimed: bool) {
        let changed = match self.claimants.borrow_mut().get_mut(token.0) {
            Some(c) if c.claimed != claimed => {
                c.claimed = claimed;
                true
            }
            _ => false,
        };
        if changed {
            self.refresh();
        }
    }

    fn refresh(&self) {
        let any = self.claimants.borrow().iter().any(|(_, c)| c.claimed);
        let cursor = if any { Cursor::Pointer } else { Cursor::Default };
        if cursor != self.shown.get() {
            trace!(cursor = cursor.css(), "cursor changed");
            self.shown.set(cursor);
            self.engine.set_cursor(cursor);
        }
    }
}
