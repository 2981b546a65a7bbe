use foundation::geo::LngLat;
use inspect::{CloseHandler, PopupOptions, PopupStyle, PopupWidget};
use js_sys::{Function, Object};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::mapbox::{MapboxMap, lng_lat_array, object};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Popup)]
    type MapboxPopup;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Popup")]
    fn new(options: &Object) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = setLngLat)]
    fn set_lng_lat(this: &MapboxPopup, lng_lat: &js_sys::Array) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = setHTML)]
    fn set_html(this: &MapboxPopup, html: &str) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = setMaxWidth)]
    fn set_max_width(this: &MapboxPopup, max_width: &str) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &MapboxPopup, map: &MapboxMap) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = on)]
    fn on_event(this: &MapboxPopup, event: &str, listener: &Function) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = off)]
    fn off_event(this: &MapboxPopup, event: &str, listener: &Function) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = remove)]
    fn remove_from_map(this: &MapboxPopup) -> MapboxPopup;
}

/// `mapboxgl.Popup` driven by a [`inspect::PopupPresenter`].
pub struct JsPopup {
    map: MapboxMap,
    popup: Option<MapboxPopup>,
    close_listener: Option<Closure<dyn FnMut(JsValue)>>,
}

impl JsPopup {
    pub fn new(map: MapboxMap) -> Self {
        Self {
            map,
            popup: None,
            close_listener: None,
        }
    }

    fn detach(&mut self) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        if let Some(listener) = self.close_listener.take() {
            popup.off_event("close", listener.as_ref().unchecked_ref());
        }
        popup.remove_from_map();
    }
}

impl PopupWidget for JsPopup {
    fn mount(&mut self, position: LngLat, options: &PopupOptions, on_close: CloseHandler) {
        self.detach();

        let popup = MapboxPopup::new(&object(&[
            ("anchor", options.anchor.as_str().into()),
            ("closeButton", options.close_button.into()),
            ("closeOnClick", options.close_on_click.into()),
            ("className", options.class_name.as_str().into()),
            ("maxWidth", options.style.max_width_css().into()),
        ]));
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| on_close());
        popup.on_event("close", listener.as_ref().unchecked_ref());
        popup.set_lng_lat(&lng_lat_array(position));
        popup.add_to(&self.map);

        self.popup = Some(popup);
        self.close_listener = Some(listener);
    }

    fn set_position(&mut self, position: LngLat) {
        if let Some(popup) = &self.popup {
            popup.set_lng_lat(&lng_lat_array(position));
        }
    }

    fn set_content(&mut self, html: &str) {
        if let Some(popup) = &self.popup {
            popup.set_html(html);
        }
    }

    fn apply_style(&mut self, style: &PopupStyle) {
        if let Some(popup) = &self.popup {
            popup.set_max_width(&style.max_width_css());
        }
    }

    fn remove(&mut self) {
        self.detach();
    }
}
