use std::rc::Rc;

use foundation::geo::{LngLat, ScreenPoint};
use foundation::handles::Handle;

use crate::feature::{Feature, FeatureId};
use crate::layer::{LayerId, SourceId};

/// Pointer notifications a listener can be registered for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Pointer moved over (or onto) a rendered feature.
    Move,
    /// Pointer left every feature of the listener's layers.
    Leave,
    Click,
}

impl PointerEventKind {
    /// Event name on the host engine.
    pub fn host_name(self) -> &'static str {
        match self {
            PointerEventKind::Move => "mousemove",
            PointerEventKind::Leave => "mouseleave",
            PointerEventKind::Click => "click",
        }
    }
}

/// What a listener is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerScope {
    /// Fires only for features of the given layers.
    Layers(Vec<LayerId>),
    /// Fires for the whole map canvas.
    Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub point: ScreenPoint,
    pub lng_lat: LngLat,
    /// Features under the pointer, top-most first. Empty for map-scoped events
    /// and for leave notifications.
    pub features: Vec<Feature>,
}

impl PointerEvent {
    pub fn new(point: ScreenPoint, lng_lat: LngLat) -> Self {
        Self {
            point,
            lng_lat,
            features: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }
}

pub type Listener = Rc<dyn Fn(&PointerEvent)>;

/// Completion callback of an asynchronous expansion-zoom lookup.
pub type ExpansionZoomCallback = Box<dyn FnOnce(Result<f64, EngineError>)>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

impl Cursor {
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Pointer => "pointer",
        }
    }
}

/// Animated camera move request.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraTarget {
    pub center: LngLat,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    UnknownLayer(LayerId),
    UnknownSource(SourceId),
    NotClustered(SourceId),
    ClusterLookup(String),
    Host(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownLayer(id) => write!(f, "layer not registered: {id}"),
            EngineError::UnknownSource(id) => write!(f, "source not registered: {id}"),
            EngineError::NotClustered(id) => write!(f, "source is not clustered: {id}"),
            EngineError::ClusterLookup(msg) => write!(f, "cluster lookup failed: {msg}"),
            EngineError::Host(msg) => write!(f, "map engine error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// The slice of the map engine the inspection pipeline consumes.
///
/// All methods take `&self`: engines are single-threaded and listeners may
/// call back into the engine (including `off`) while being dispatched.
pub trait MapEngine {
    fn has_layer(&self, layer: &LayerId) -> bool;

    fn on(
        &self,
        kind: PointerEventKind,
        scope: ListenerScope,
        listener: Listener,
    ) -> Result<ListenerId, EngineError>;

    /// Unregisters a listener. Returns `false` when `id` was not registered.
    fn off(&self, id: ListenerId) -> bool;

    /// Rendered features at `point`, top-most first, optionally restricted to `layers`.
    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: Option<&[LayerId]>,
    ) -> Vec<Feature>;

    /// Resolves the zoom at which `cluster_id` of `source` splits apart.
    ///
    /// `done` may run synchronously or on a later turn of the host loop.
    fn cluster_expansion_zoom(
        &self,
        source: &SourceId,
        cluster_id: u64,
        done: ExpansionZoomCallback,
    );

    fn ease_to(&self, target: CameraTarget);

    fn set_cursor(&self, cursor: Cursor);

    fn set_feature_state(&self, source: &SourceId, id: &FeatureId, hover: bool);
}
