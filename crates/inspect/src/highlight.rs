use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use layers::{
    FeatureId, LayerId, ListenerId, ListenerScope, MapEngine, PointerEvent, PointerEventKind,
    SourceId,
};
use tracing::{debug, trace};

use crate::error::InspectError;

struct HighlightState {
    engine: Weak<dyn MapEngine>,
    source: SourceId,
    active: Cell<bool>,
    hovered: RefCell<Option<FeatureId>>,
}

impl HighlightState {
    fn handle_move(&self, event: &PointerEvent) {
        if !self.active.get() {
            return;
        }
        let Some(id) = event.features.first().and_then(|f| f.id.clone()) else {
            return;
        };
        if self.hovered.borrow().as_ref() == Some(&id) {
            return;
        }
        self.unset();
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        trace!(source = %self.source, feature = %id, "hover state set");
        engine.set_feature_state(&self.source, &id, true);
        *self.hovered.borrow_mut() = Some(id);
    }

    fn unset(&self) {
        let Some(previous) = self.hovered.borrow_mut().take() else {
            return;
        };
        if let Some(engine) = self.engine.upgrade() {
            engine.set_feature_state(&self.source, &previous, false);
        }
    }
}

/// Keeps the `hover` feature-state flag on the feature under the pointer.
///
/// At most one feature of the source is flagged at a time. Leaving the layer
/// or tearing down clears the flag.
pub struct HoverHighlight {
    engine: Rc<dyn MapEngine>,
    state: Rc<HighlightState>,
    listeners: RefCell<Vec<ListenerId>>,
}

impl HoverHighlight {
    pub fn subscribe(
        engine: Rc<dyn MapEngine>,
        source: SourceId,
        layer: LayerId,
    ) -> Result<Self, InspectError> {
        if !engine.has_layer(&layer) {
            return Err(InspectError::UnknownLayer(layer));
        }
        let state = Rc::new(HighlightState {
            engine: Rc::downgrade(&engine),
            source,
            active: Cell::new(true),
            hovered: RefCell::new(None),
        });
        let highlight = Self {
            engine: engine.clone(),
            state: state.clone(),
            listeners: RefCell::new(Vec::new()),
        };

        let scope = ListenerScope::Layers(vec![layer.clone()]);
        let s = state.clone();
        let moved = engine.on(
            PointerEventKind::Move,
            scope.clone(),
            Rc::new(move |event: &PointerEvent| s.handle_move(event)),
        )?;
        highlight.listeners.borrow_mut().push(moved);

        let s = state;
        let left = engine.on(
            PointerEventKind::Leave,
            scope,
            Rc::new(move |_event: &PointerEvent| {
                if s.active.get() {
                    s.unset();
                }
            }),
        )?;
        highlight.listeners.borrow_mut().push(left);

        debug!(%layer, source = %highlight.state.source, "hover highlight registered");
        Ok(highlight)
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.state.hovered.borrow().clone()
    }

    /// Idempotent; clears the flag and unregisters both listeners.
    pub fn teardown(&self) {
        if !self.state.active.replace(false) {
            return;
        }
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for id in listeners {
            self.engine.off(id);
        }
        self.state.unset();
    }
}

impl Drop for HoverHighlight {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::HoverHighlight;
    use foundation::geo::{LngLat, ScreenPoint};
    use layers::headless::HeadlessMap;
    use layers::{Feature, FeatureId, LayerId, Properties, SourceId};
    use pretty_assertions::assert_eq;

    fn region(name: &str) -> Properties {
        [("name", name)].into_iter().collect()
    }

    fn map() -> Rc<HeadlessMap> {
        let map = Rc::new(HeadlessMap::new());
        map.add_layer("states-border", "states");
        map.draw(
            "states-border",
            ScreenPoint::new(0.0, 0.0),
            10.0,
            Feature::point(LngLat::default(), region("Murmansk")).with_id(FeatureId::Number(1)),
        );
        map.draw(
            "states-border",
            ScreenPoint::new(30.0, 0.0),
            10.0,
            Feature::point(LngLat::default(), region("Karelia")).with_id(FeatureId::Number(2)),
        );
        map.draw(
            "states-border",
            ScreenPoint::new(60.0, 0.0),
            10.0,
            Feature::point(LngLat::default(), region("Unnamed")),
        );
        map
    }

    fn subscribe(map: &Rc<HeadlessMap>) -> HoverHighlight {
        HoverHighlight::subscribe(
            map.clone(),
            SourceId::new("states"),
            LayerId::new("states-border"),
        )
        .expect("subscribed")
    }

    #[test]
    fn only_the_feature_under_the_pointer_is_flagged() {
        let map = map();
        let highlight = subscribe(&map);
        let states = SourceId::new("states");

        map.move_pointer(ScreenPoint::new(0.0, 0.0), LngLat::default());
        assert_eq!(map.hovered_features(&states), vec![FeatureId::Number(1)]);

        map.move_pointer(ScreenPoint::new(30.0, 0.0), LngLat::default());
        assert_eq!(map.hovered_features(&states), vec![FeatureId::Number(2)]);
        assert_eq!(map.feature_state(&states, &FeatureId::Number(1)), Some(false));

        // Features without ids leave the current flag alone.
        map.move_pointer(ScreenPoint::new(60.0, 0.0), LngLat::default());
        assert_eq!(highlight.hovered(), Some(FeatureId::Number(2)));

        map.move_pointer(ScreenPoint::new(500.0, 500.0), LngLat::default());
        assert!(map.hovered_features(&states).is_empty());
        assert_eq!(highlight.hovered(), None);
    }

    #[test]
    fn teardown_clears_flag_and_listeners() {
        let map = map();
        let highlight = subscribe(&map);
        map.move_pointer(ScreenPoint::new(0.0, 0.0), LngLat::default());

        highlight.teardown();
        highlight.teardown();
        assert!(map.hovered_features(&SourceId::new("states")).is_empty());
        assert_eq!(map.listener_count(), 0);

        map.move_pointer(ScreenPoint::new(30.0, 0.0), LngLat::default());
        assert!(map.hovered_features(&SourceId::new("states")).is_empty());
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let map = map();
        let result = HoverHighlight::subscribe(
            map.clone(),
            SourceId::new("states"),
            LayerId::new("nope"),
        );
        assert!(result.is_err());
        assert_eq!(map.listener_count(), 0);
    }
}
