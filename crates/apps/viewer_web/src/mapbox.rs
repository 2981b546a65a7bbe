use std::cell::RefCell;
use std::rc::Rc;

use foundation::arena::Arena;
use foundation::geo::{LngLat, ScreenPoint};
use js_sys::{Array, Function, Object, Reflect};
use layers::{
    CameraTarget, Cursor, EngineError, ExpansionZoomCallback, Feature, FeatureId, LayerId,
    Listener, ListenerId, ListenerScope, MapEngine, PointerEvent, PointerEventKind, SourceId,
};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

#[wasm_bindgen]
extern "C" {
    /// A `mapboxgl.Map` instance handed over from the page.
    #[derive(Clone, Debug)]
    pub type MapboxMap;

    #[wasm_bindgen(method, js_name = getLayer)]
    fn get_layer(this: &MapboxMap, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = on)]
    fn on_layers(this: &MapboxMap, event: &str, layers: &Array, listener: &Function);

    #[wasm_bindgen(method, js_name = on)]
    fn on_canvas(this: &MapboxMap, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = off)]
    fn off_layers(this: &MapboxMap, event: &str, layers: &Array, listener: &Function);

    #[wasm_bindgen(method, js_name = off)]
    fn off_canvas(this: &MapboxMap, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = queryRenderedFeatures)]
    fn query_rendered(this: &MapboxMap, point: &Array, options: &JsValue) -> JsValue;

    #[wasm_bindgen(method, js_name = getSource)]
    fn get_source(this: &MapboxMap, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = easeTo)]
    fn ease(this: &MapboxMap, options: &Object);

    #[wasm_bindgen(method, js_name = getCanvasContainer)]
    fn canvas_container(this: &MapboxMap) -> HtmlElement;

    #[wasm_bindgen(method, js_name = setFeatureState)]
    fn feature_state(this: &MapboxMap, feature: &Object, state: &Object);

    type ClusteredSource;

    #[wasm_bindgen(method, catch, js_name = getClusterExpansionZoom)]
    fn expansion_zoom(
        this: &ClusteredSource,
        cluster_id: f64,
        callback: &JsValue,
    ) -> Result<(), JsValue>;
}

/// Builds a plain JS object from key/value pairs.
pub(crate) fn object(entries: &[(&str, JsValue)]) -> Object {
    let obj = Object::new();
    for (key, value) in entries {
        // Setting own properties of a fresh object cannot throw.
        let _ = Reflect::set(&obj, &JsValue::from_str(key), value);
    }
    obj
}

pub(crate) fn lng_lat_array(position: LngLat) -> Array {
    Array::of2(&position.lon.into(), &position.lat.into())
}

fn field(value: &JsValue, key: &str) -> Result<JsValue, EngineError> {
    Reflect::get(value, &JsValue::from_str(key)).map_err(|err| host_error(&err))
}

fn number(value: &JsValue, key: &str) -> Result<f64, EngineError> {
    field(value, key)?
        .as_f64()
        .ok_or_else(|| EngineError::Host(format!("`{key}` is not a number")))
}

fn host_error(err: &JsValue) -> EngineError {
    EngineError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Decodes an array of rendered features through their JSON form.
fn decode_features(value: &JsValue) -> Result<Vec<Feature>, EngineError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Vec::new());
    }
    let json = js_sys::JSON::stringify(value)
        .map(String::from)
        .map_err(|err| host_error(&err))?;
    serde_json::from_str(&json).map_err(|err| EngineError::Host(err.to_string()))
}

fn decode_event(event: &JsValue) -> Result<PointerEvent, EngineError> {
    let point = field(event, "point")?;
    let lng_lat = field(event, "lngLat")?;
    let features = decode_features(&field(event, "features")?)?;
    Ok(PointerEvent::new(
        ScreenPoint::new(number(&point, "x")?, number(&point, "y")?),
        LngLat::new(number(&lng_lat, "lng")?, number(&lng_lat, "lat")?),
    )
    .with_features(features))
}

fn feature_id(id: &FeatureId) -> JsValue {
    match id {
        FeatureId::Number(n) => JsValue::from_f64(*n as f64),
        FeatureId::String(s) => JsValue::from_str(s),
    }
}

struct Registration {
    event: &'static str,
    layers: Option<Array>,
    closure: Closure<dyn FnMut(JsValue)>,
}

/// [`MapEngine`] over a live mapbox-gl map.
pub struct JsMap {
    map: MapboxMap,
    registrations: RefCell<Arena<Registration>>,
    // Closures unregistered while possibly still on the JS stack; freed on
    // the next frame.
    retired: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
}

impl JsMap {
    pub fn new(map: MapboxMap) -> Self {
        Self {
            map,
            registrations: RefCell::new(Arena::new()),
            retired: RefCell::new(Vec::new()),
        }
    }

    /// Frees listener closures removed while they were being dispatched.
    pub fn release_retired(&self) {
        self.retired.borrow_mut().clear();
    }

    /// Unregisters everything still attached to the map.
    pub fn detach_all(&self) {
        let ids: Vec<ListenerId> = self
            .registrations
            .borrow()
            .iter()
            .map(|(handle, _)| ListenerId(handle))
            .collect();
        for id in ids {
            self.off(id);
        }
    }
}

impl MapEngine for JsMap {
    fn has_layer(&self, layer: &LayerId) -> bool {
        let found = self.map.get_layer(layer.as_str());
        !(found.is_undefined() || found.is_null())
    }

    fn on(
        &self,
        kind: PointerEventKind,
        scope: ListenerScope,
        listener: Listener,
    ) -> Result<ListenerId, EngineError> {
        let layers = match &scope {
            ListenerScope::Layers(layers) => {
                if let Some(missing) = layers.iter().find(|l| !self.has_layer(l)) {
                    return Err(EngineError::UnknownLayer(missing.clone()));
                }
                Some(layers.iter().map(|l| JsValue::from_str(l.as_str())).collect::<Array>())
            }
            ListenerScope::Map => None,
        };

        let event = kind.host_name();
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |raw: JsValue| {
            match decode_event(&raw) {
                Ok(decoded) => listener(&decoded),
                Err(err) => warn!(event, %err, "dropped pointer event"),
            }
        });

        let function: &Function = closure.as_ref().unchecked_ref();
        match &layers {
            Some(layers) => self.map.on_layers(event, layers, function),
            None => self.map.on_canvas(event, function),
        }

        let handle = self.registrations.borrow_mut().insert(Registration {
            event,
            layers,
            closure,
        });
        Ok(ListenerId(handle))
    }

    fn off(&self, id: ListenerId) -> bool {
        let Some(reg) = self.registrations.borrow_mut().remove(id.0) else {
            return false;
        };
        let function: &Function = reg.closure.as_ref().unchecked_ref();
        match &reg.layers {
            Some(layers) => self.map.off_layers(reg.event, layers, function),
            None => self.map.off_canvas(reg.event, function),
        }
        self.retired.borrow_mut().push(reg.closure);
        true
    }

    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: Option<&[LayerId]>,
    ) -> Vec<Feature> {
        let options = match layers {
            Some(layers) => {
                let ids: Array = layers.iter().map(|l| JsValue::from_str(l.as_str())).collect();
                object(&[("layers", ids.into())]).into()
            }
            None => JsValue::UNDEFINED,
        };
        let raw = self
            .map
            .query_rendered(&Array::of2(&point.x.into(), &point.y.into()), &options);
        decode_features(&raw).unwrap_or_else(|err| {
            warn!(%err, "queryRenderedFeatures returned unreadable features");
            Vec::new()
        })
    }

    fn cluster_expansion_zoom(
        &self,
        source: &SourceId,
        cluster_id: u64,
        done: ExpansionZoomCallback,
    ) {
        let raw = self.map.get_source(source.as_str());
        if raw.is_undefined() || raw.is_null() {
            done(Err(EngineError::UnknownSource(source.clone())));
            return;
        }
        let clustered = Reflect::get(&raw, &JsValue::from_str("getClusterExpansionZoom"))
            .map(|f| f.is_function())
            .unwrap_or(false);
        if !clustered {
            done(Err(EngineError::NotClustered(source.clone())));
            return;
        }

        // Shared so a synchronous throw can still complete the lookup.
        let pending = Rc::new(RefCell::new(Some(done)));
        let resolve = pending.clone();
        let callback = Closure::once_into_js(move |err: JsValue, zoom: JsValue| {
            let Some(done) = resolve.borrow_mut().take() else {
                return;
            };
            if !(err.is_null() || err.is_undefined()) {
                done(Err(EngineError::ClusterLookup(
                    err.as_string().unwrap_or_else(|| format!("{err:?}")),
                )));
                return;
            }
            done(
                zoom.as_f64()
                    .ok_or_else(|| EngineError::ClusterLookup("zoom missing".to_string())),
            );
        });

        let source_handle: ClusteredSource = raw.unchecked_into();
        if let Err(err) = source_handle.expansion_zoom(cluster_id as f64, &callback) {
            let done = pending.borrow_mut().take();
            if let Some(done) = done {
                done(Err(host_error(&err)));
            }
        }
    }

    fn ease_to(&self, target: CameraTarget) {
        self.map.ease(&object(&[
            ("center", lng_lat_array(target.center).into()),
            ("zoom", target.zoom.into()),
        ]));
    }

    fn set_cursor(&self, cursor: Cursor) {
        if let Err(err) = self
            .map
            .canvas_container()
            .style()
            .set_property("cursor", cursor.css())
        {
            warn!(?err, "could not set cursor");
        }
    }

    fn set_feature_state(&self, source: &SourceId, id: &FeatureId, hover: bool) {
        self.map.feature_state(
            &object(&[("source", source.as_str().into()), ("id", feature_id(id))]),
            &object(&[("hover", hover.into())]),
        );
    }
}
