use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use foundation::arena::Arena;
use foundation::geo::{LngLat, ScreenPoint};

use crate::engine::{
    CameraTarget, Cursor, EngineError, ExpansionZoomCallback, Listener, ListenerId, ListenerScope,
    MapEngine, PointerEvent, PointerEventKind,
};
use crate::feature::{Feature, FeatureId};
use crate::layer::{LayerId, SourceId};
use crate::query::{RenderedFeature, RenderedIndex};

struct Registration {
    kind: PointerEventKind,
    scope: ListenerScope,
    listener: Listener,
}

/// In-memory map engine.
///
/// Drives the inspection pipeline without a browser: features are "drawn" as
/// circular hit regions, pointer input is simulated, and asynchronous engine
/// work (expansion-zoom lookups) is queued until [`HeadlessMap::flush_async`].
#[derive(Default)]
pub struct HeadlessMap {
    layers: RefCell<BTreeMap<LayerId, SourceId>>,
    clustered: RefCell<BTreeSet<SourceId>>,
    rendered: RefCell<RenderedIndex>,
    listeners: RefCell<Arena<Registration>>,
    inside: RefCell<BTreeSet<ListenerId>>,
    expansion_zooms: RefCell<BTreeMap<(SourceId, u64), f64>>,
    pending: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    camera_moves: RefCell<Vec<CameraTarget>>,
    cursor: Cell<Cursor>,
    feature_state: RefCell<BTreeMap<(SourceId, FeatureId), bool>>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&self, layer: impl Into<LayerId>, source: impl Into<SourceId>) {
        self.layers.borrow_mut().insert(layer.into(), source.into());
    }

    pub fn set_clustered(&self, source: impl Into<SourceId>) {
        self.clustered.borrow_mut().insert(source.into());
    }

    pub fn set_expansion_zoom(&self, source: impl Into<SourceId>, cluster_id: u64, zoom: f64) {
        self.expansion_zooms
            .borrow_mut()
            .insert((source.into(), cluster_id), zoom);
    }

    /// Draws `feature` on `layer`, hit-testable within `radius_px` of `anchor`.
    ///
    /// The feature is stamped with its layer and that layer's source.
    pub fn draw(
        &self,
        layer: impl Into<LayerId>,
        anchor: ScreenPoint,
        radius_px: f64,
        mut feature: Feature,
    ) {
        let layer = layer.into();
        feature.source = self.layers.borrow().get(&layer).cloned();
        feature.layer = Some(layer.clone());
        self.rendered.borrow_mut().push(RenderedFeature {
            layer,
            anchor,
            radius_px,
            feature,
        });
    }

    pub fn clear_drawn(&self) {
        self.rendered.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor.get()
    }

    pub fn camera_moves(&self) -> Vec<CameraTarget> {
        self.camera_moves.borrow().clone()
    }

    pub fn feature_state(&self, source: &SourceId, id: &FeatureId) -> Option<bool> {
        self.feature_state
            .borrow()
            .get(&(source.clone(), id.clone()))
            .copied()
    }

    /// Feature ids of `source` currently flagged as hovered.
    pub fn hovered_features(&self, source: &SourceId) -> Vec<FeatureId> {
        self.feature_state
            .borrow()
            .iter()
            .filter(|((s, _), hover)| s == source && **hover)
            .map(|((_, id), _)| id.clone())
            .collect()
    }

    /// Runs queued asynchronous completions. Returns how many ran.
    pub fn flush_async(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(task) = self.pending.borrow_mut().pop_front() else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    /// Simulates the pointer moving to `point`.
    ///
    /// Layer-scoped move listeners fire when any of their layers has features
    /// under the pointer; layer-scoped leave listeners fire once the pointer
    /// stops touching all of their layers.
    pub fn move_pointer(&self, point: ScreenPoint, lng_lat: LngLat) {
        for (id, reg) in self.snapshot() {
            match (reg.0, &reg.1) {
                (PointerEventKind::Move, ListenerScope::Layers(layers)) => {
                    let features = self.query_rendered_features(point, Some(layers));
                    if features.is_empty() {
                        continue;
                    }
                    let event = PointerEvent::new(point, lng_lat).with_features(features);
                    self.fire(id, &reg.2, &event);
                }
                (PointerEventKind::Move, ListenerScope::Map) => {
                    self.fire(id, &reg.2, &PointerEvent::new(point, lng_lat));
                }
                (PointerEventKind::Leave, ListenerScope::Layers(layers)) => {
                    let touching = !self.query_rendered_features(point, Some(layers)).is_empty();
                    let was_inside = if touching {
                        !self.inside.borrow_mut().insert(id)
                    } else {
                        self.inside.borrow_mut().remove(&id)
                    };
                    if was_inside && !touching {
                        self.fire(id, &reg.2, &PointerEvent::new(point, lng_lat));
                    }
                }
                _ => {}
            }
        }
    }

    /// Simulates a click at `point`.
    pub fn click(&self, point: ScreenPoint, lng_lat: LngLat) {
        for (id, reg) in self.snapshot() {
            match (reg.0, &reg.1) {
                (PointerEventKind::Click, ListenerScope::Layers(layers)) => {
                    let features = self.query_rendered_features(point, Some(layers));
                    if features.is_empty() {
                        continue;
                    }
                    let event = PointerEvent::new(point, lng_lat).with_features(features);
                    self.fire(id, &reg.2, &event);
                }
                (PointerEventKind::Click, ListenerScope::Map) => {
                    self.fire(id, &reg.2, &PointerEvent::new(point, lng_lat));
                }
                _ => {}
            }
        }
    }

    /// Delivers `event` verbatim to every `kind` listener scoped to `layer`.
    ///
    /// Bypasses hit testing, so callers can feed events the engine would
    /// rarely produce (e.g. a move with an empty feature list).
    pub fn emit(&self, kind: PointerEventKind, layer: &LayerId, event: &PointerEvent) {
        for (id, reg) in self.snapshot() {
            if reg.0 != kind {
                continue;
            }
            let ListenerScope::Layers(layers) = &reg.1 else {
                continue;
            };
            if layers.contains(layer) {
                self.fire(id, &reg.2, event);
            }
        }
    }

    fn snapshot(&self) -> Vec<(ListenerId, (PointerEventKind, ListenerScope, Listener))> {
        self.listeners
            .borrow()
            .iter()
            .map(|(h, r)| (ListenerId(h), (r.kind, r.scope.clone(), r.listener.clone())))
            .collect()
    }

    fn fire(&self, id: ListenerId, listener: &Listener, event: &PointerEvent) {
        // An earlier listener in the same dispatch may have unregistered this one.
        if !self.listeners.borrow().contains(id.0) {
            return;
        }
        listener(event);
    }

    fn source_of_any_layer(&self, source: &SourceId) -> bool {
        self.layers.borrow().values().any(|s| s == source)
    }
}

impl MapEngine for HeadlessMap {
    fn has_layer(&self, layer: &LayerId) -> bool {
        self.layers.borrow().contains_key(layer)
    }

    fn on(
        &self,
        kind: PointerEventKind,
        scope: ListenerScope,
        listener: Listener,
    ) -> Result<ListenerId, EngineError> {
        if let ListenerScope::Layers(layers) = &scope
            && let Some(missing) = layers.iter().find(|l| !self.has_layer(l))
        {
            return Err(EngineError::UnknownLayer(missing.clone()));
        }
        let handle = self.listeners.borrow_mut().insert(Registration {
            kind,
            scope,
            listener,
        });
        Ok(ListenerId(handle))
    }

    fn off(&self, id: ListenerId) -> bool {
        self.inside.borrow_mut().remove(&id);
        self.listeners.borrow_mut().remove(id.0).is_some()
    }

    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: Option<&[LayerId]>,
    ) -> Vec<Feature> {
        self.rendered.borrow().query(point, layers)
    }

    fn cluster_expansion_zoom(
        &self,
        source: &SourceId,
        cluster_id: u64,
        done: ExpansionZoomCallback,
    ) {
        let result = if !self.source_of_any_layer(source) {
            Err(EngineError::UnknownSource(source.clone()))
        } else if !self.clustered.borrow().contains(source) {
            Err(EngineError::NotClustered(source.clone()))
        } else {
            self.expansion_zooms
                .borrow()
                .get(&(source.clone(), cluster_id))
                .copied()
                .ok_or_else(|| EngineError::ClusterLookup(format!("no cluster {cluster_id}")))
        };
        self.pending
            .borrow_mut()
            .push_back(Box::new(move || done(result)));
    }

    fn ease_to(&self, target: CameraTarget) {
        self.camera_moves.borrow_mut().push(target);
    }

    fn set_cursor(&self, cursor: Cursor) {
        self.cursor.set(cursor);
    }

    fn set_feature_state(&self, source: &SourceId, id: &FeatureId, hover: bool) {
        self.feature_state
            .borrow_mut()
            .insert((source.clone(), id.clone()), hover);
    }
}
