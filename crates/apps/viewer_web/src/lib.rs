use console_error_panic_hook::set_once;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{Level, error};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use inspect::{
    ClickSubscription, HoverHighlight, InspectPopup, Inspector, ProjectClick, ProjectClickOptions,
};
use layers::{LayerId, MapEngine, SourceId};
use runtime::Frame;

mod config;
mod logging;
mod mapbox;
mod popup;

use config::{MountConfig, MountError, PopupKind, group};
use mapbox::{JsMap, MapboxMap};
use popup::JsPopup;

struct MountedMap {
    engine: Rc<JsMap>,
    inspector: Inspector,
    popups: Vec<InspectPopup<JsPopup>>,
    cluster_zooms: Vec<ClickSubscription>,
    highlights: Vec<HoverHighlight>,
    projects: Vec<ProjectClick>,
    frame: Frame,
}

impl MountedMap {
    fn teardown(self) {
        let MountedMap {
            engine,
            inspector,
            popups,
            cluster_zooms,
            highlights,
            projects,
            frame: _,
        } = self;
        drop(projects);
        drop(highlights);
        drop(cluster_zooms);
        drop(popups);
        drop(inspector);
        engine.detach_all();
    }
}

thread_local! {
    static STATE: RefCell<Option<MountedMap>> = const { RefCell::new(None) };
}

impl From<MountError> for JsValue {
    fn from(err: MountError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    logging::init(Level::DEBUG);
    Ok(())
}

fn href_callback(f: js_sys::Function) -> impl Fn(&str) {
    move |href: &str| {
        if let Err(err) = f.call1(&JsValue::NULL, &JsValue::from_str(href)) {
            error!(?err, "project click handler failed");
        }
    }
}

fn notify_callback(f: js_sys::Function) -> impl Fn() {
    move || {
        if let Err(err) = f.call0(&JsValue::NULL) {
            error!(?err, "background click handler failed");
        }
    }
}

fn mount_inner(
    map: MapboxMap,
    cfg: MountConfig,
    on_project_click: Option<js_sys::Function>,
    on_background_click: Option<js_sys::Function>,
) -> Result<MountedMap, MountError> {
    let engine = Rc::new(JsMap::new(map.clone()));
    let dyn_engine: Rc<dyn MapEngine> = engine.clone();
    let inspector = Inspector::new(dyn_engine, cfg.aliases);

    let mut popups = Vec::with_capacity(cfg.popups.len());
    for mount in &cfg.popups {
        let layers = group(&mount.layers)?;
        let widget = JsPopup::new(map.clone());
        let popup = match mount.kind {
            PopupKind::Feature => inspector.feature_popup(layers, widget, cfg.popup.clone())?,
            PopupKind::Cluster => inspector.cluster_popup(layers, widget, cfg.popup.clone())?,
        };
        popups.push(popup);
    }

    let cluster_zooms = cfg
        .cluster_zoom
        .iter()
        .map(|layers| Ok(inspector.cluster_zoom(group(layers)?)?))
        .collect::<Result<Vec<_>, MountError>>()?;

    let highlights = cfg
        .highlights
        .iter()
        .map(|h| {
            let source = SourceId::new(h.source.as_str());
            Ok(inspector.highlight(source, LayerId::new(h.layer.as_str()))?)
        })
        .collect::<Result<Vec<_>, MountError>>()?;

    let mut projects = Vec::new();
    if !cfg.project_layers.is_empty() {
        let mut options = ProjectClickOptions::default();
        if let Some(f) = on_project_click {
            options = options.on_project_click(href_callback(f));
        }
        if let Some(f) = on_background_click {
            options = options.on_background_click(notify_callback(f));
        }
        projects.push(inspector.project_click(group(&cfg.project_layers)?, options)?);
    }

    Ok(MountedMap {
        engine,
        inspector,
        popups,
        cluster_zooms,
        highlights,
        projects,
        frame: Frame::new(0),
    })
}

/// Mounts popups, cluster zoom, highlights and project clicks on `map`.
///
/// Replaces whatever was mounted before.
#[wasm_bindgen]
pub fn mount(
    map: JsValue,
    config_json: &str,
    on_project_click: Option<js_sys::Function>,
    on_background_click: Option<js_sys::Function>,
) -> Result<(), JsValue> {
    unmount();
    let cfg = MountConfig::from_json(config_json)?;
    let mounted = mount_inner(
        map.unchecked_into::<MapboxMap>(),
        cfg,
        on_project_click,
        on_background_click,
    )
    .inspect_err(|err| error!(%err, "mount failed"))?;
    STATE.with(|state| *state.borrow_mut() = Some(mounted));
    Ok(())
}

#[wasm_bindgen]
pub fn unmount() {
    let previous = STATE.with(|state| state.borrow_mut().take());
    if let Some(mounted) = previous {
        mounted.teardown();
    }
}

/// Runs deferred popup work for one animation frame.
///
/// Call from `requestAnimationFrame`, before the browser paints.
#[wasm_bindgen]
pub fn advance_frame() -> u64 {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        let Some(mounted) = state.as_mut() else {
            return 0;
        };
        let engine = mounted.engine.clone();
        mounted
            .inspector
            .on_paint("release-listeners", move |_| engine.release_retired());
        mounted.inspector.run_frame(mounted.frame);
        mounted.frame = mounted.frame.next();
        mounted.frame.index
    })
}

/// Current hover state of every mounted popup, as JSON.
#[wasm_bindgen]
pub fn hover_snapshot() -> String {
    STATE.with(|state| {
        let state = state.borrow();
        let Some(mounted) = state.as_ref() else {
            return "[]".to_string();
        };
        let entries: Vec<serde_json::Value> = mounted
            .popups
            .iter()
            .map(|popup| {
                let current = popup.store().current();
                serde_json::json!({
                    "group": popup.group().to_string(),
                    "position": current.as_ref().map(|f| f.position.to_array()),
                    "properties": current.as_ref().map(|f| &f.properties),
                    "content": popup.content(),
                })
            })
            .collect();
        serde_json::Value::Array(entries).to_string()
    })
}
