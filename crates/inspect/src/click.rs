use std::cell::Cell;
use std::rc::Rc;

use layers::{LayerGroup, ListenerId, ListenerScope, MapEngine, PointerEvent, PointerEventKind};
use tracing::{debug, trace};

use crate::bridge::{HoverSubscription, PointerBridge};
use crate::error::InspectError;

/// Registers click listeners on the map.
#[derive(Clone)]
pub struct ClickRouter {
    engine: Rc<dyn MapEngine>,
}

impl ClickRouter {
    pub fn new(engine: Rc<dyn MapEngine>) -> Self {
        Self { engine }
    }

    /// Clicks that hit a feature of `group`.
    pub fn on_layer_click(
        &self,
        group: &LayerGroup,
        cb: impl Fn(&PointerEvent) + 'static,
    ) -> Result<ClickSubscription, InspectError> {
        if let Some(missing) = group.layers().iter().find(|l| !self.engine.has_layer(l)) {
            return Err(InspectError::UnknownLayer(missing.clone()));
        }
        self.register(ListenerScope::Layers(group.layers().to_vec()), cb)
    }

    /// Every click on the map canvas, whether or not it hit a feature.
    pub fn on_background_click(
        &self,
        cb: impl Fn(&PointerEvent) + 'static,
    ) -> Result<ClickSubscription, InspectError> {
        self.register(ListenerScope::Map, cb)
    }

    fn register(
        &self,
        scope: ListenerScope,
        cb: impl Fn(&PointerEvent) + 'static,
    ) -> Result<ClickSubscription, InspectError> {
        let active = Rc::new(Cell::new(true));
        let flag = active.clone();
        let id = self.engine.on(
            PointerEventKind::Click,
            scope,
            Rc::new(move |event: &PointerEvent| {
                if flag.get() {
                    cb(event);
                }
            }),
        )?;
        trace!(listener = %id.0, "click listener registered");
        Ok(ClickSubscription {
            engine: self.engine.clone(),
            listener: id,
            active,
        })
    }
}

/// One registered click listener. Dropping it unregisters the listener.
pub struct ClickSubscription {
    engine: Rc<dyn MapEngine>,
    listener: ListenerId,
    active: Rc<Cell<bool>>,
}

impl ClickSubscription {
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Idempotent; the callback never runs after this returns.
    pub fn teardown(&self) {
        if self.active.replace(false) {
            self.engine.off(self.listener);
        }
    }
}

impl Drop for ClickSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

type HrefCallback = Rc<dyn Fn(&str)>;
type BackgroundCallback = Rc<dyn Fn()>;

#[derive(Clone, Default)]
pub struct ProjectClickOptions {
    pub on_background_click: Option<BackgroundCallback>,
    pub on_project_click: Option<HrefCallback>,
}

impl ProjectClickOptions {
    pub fn on_background_click(mut self, cb: impl Fn() + 'static) -> Self {
        self.on_background_click = Some(Rc::new(cb));
        self
    }

    pub fn on_project_click(mut self, cb: impl Fn(&str) + 'static) -> Self {
        self.on_project_click = Some(Rc::new(cb));
        self
    }
}

/// Clickable project markers: pointer cursor over the group, the first
/// clicked feature's `href` forwarded to `on_project_click`, and every map
/// click forwarded to `on_background_click`.
pub struct ProjectClick {
    hover: HoverSubscription,
    background: Option<ClickSubscription>,
    layer: ClickSubscription,
}

impl ProjectClick {
    pub const HREF_KEY: &'static str = "href";

    pub fn subscribe(
        bridge: &PointerBridge,
        group: LayerGroup,
        options: ProjectClickOptions,
    ) -> Result<Self, InspectError> {
        let router = ClickRouter::new(bridge.engine().clone());
        let hover = bridge.subscribe(group.clone())?;

        let background = match options.on_background_click {
            Some(cb) => Some(router.on_background_click(move |_| cb())?),
            None => None,
        };

        let on_project = options.on_project_click;
        let layer = router.on_layer_click(&group, move |event| {
            let Some(href) = event
                .features
                .first()
                .and_then(|f| f.properties.as_ref())
                .and_then(|p| p.get(Self::HREF_KEY))
                .filter(|v| v.is_truthy())
                .map(ToString::to_string)
            else {
                return;
            };
            let Some(cb) = on_project.as_ref() else {
                return;
            };
            debug!(%href, "project clicked");
            cb(&href);
        })?;

        Ok(Self {
            hover,
            background,
            layer,
        })
    }

    pub fn teardown(&self) {
        self.layer.teardown();
        if let Some(bg) = &self.background {
            bg.teardown();
        }
        self.hover.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{ClickRouter, ProjectClick, ProjectClickOptions};
    use crate::bridge::PointerBridge;
    use crate::error::InspectError;
    use crate::pointer::PointerAffordance;
    use foundation::geo::{LngLat, ScreenPoint};
    use layers::headless::HeadlessMap;
    use layers::{Cursor, Feature, LayerGroup, LayerId, Properties};
    use pretty_assertions::assert_eq;

    fn map() -> Rc<HeadlessMap> {
        let map = Rc::new(HeadlessMap::new());
        map.add_layer("projects", "projects-src");
        map.draw(
            "projects",
            ScreenPoint::new(10.0, 10.0),
            5.0,
            Feature::point(
                LngLat::new(33.0, 68.0),
                [("href", "/projects/42"), ("нп", "Кола")]
                    .into_iter()
                    .collect::<Properties>(),
            ),
        );
        map
    }

    fn bridge(map: &Rc<HeadlessMap>) -> PointerBridge {
        PointerBridge::new(map.clone(), Rc::new(PointerAffordance::new(map.clone())))
    }

    #[test]
    fn layer_click_only_fires_on_hits() {
        let map = map();
        let router = ClickRouter::new(map.clone());
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let _sub = router
            .on_layer_click(&LayerGroup::single("projects"), move |_| *h.borrow_mut() += 1)
            .expect("subscribed");

        map.click(ScreenPoint::new(10.0, 10.0), LngLat::default());
        map.click(ScreenPoint::new(100.0, 100.0), LngLat::default());
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn layer_click_rejects_unknown_layers() {
        let map = map();
        let router = ClickRouter::new(map.clone());
        let err = router
            .on_layer_click(&LayerGroup::single("missing"), |_| {})
            .err()
            .expect("rejected");
        assert_eq!(err, InspectError::UnknownLayer(LayerId::new("missing")));
        assert_eq!(map.listener_count(), 0);
    }

    #[test]
    fn teardown_and_drop_unregister() {
        let map = map();
        let router = ClickRouter::new(map.clone());
        let sub = router.on_background_click(|_| {}).expect("subscribed");
        let other = router.on_background_click(|_| {}).expect("subscribed");
        assert_eq!(map.listener_count(), 2);

        sub.teardown();
        sub.teardown();
        assert!(!sub.is_active());
        assert_eq!(map.listener_count(), 1);

        drop(other);
        assert_eq!(map.listener_count(), 0);
    }

    #[test]
    fn project_click_forwards_href_and_background() {
        let map = map();
        let links = Rc::new(RefCell::new(Vec::new()));
        let backgrounds = Rc::new(RefCell::new(0));

        let l = links.clone();
        let b = backgrounds.clone();
        let project = ProjectClick::subscribe(
            &bridge(&map),
            LayerGroup::single("projects"),
            ProjectClickOptions::default()
                .on_project_click(move |href| l.borrow_mut().push(href.to_string()))
                .on_background_click(move || *b.borrow_mut() += 1),
        )
        .expect("subscribed");

        map.click(ScreenPoint::new(10.0, 10.0), LngLat::default());
        map.click(ScreenPoint::new(200.0, 0.0), LngLat::default());

        assert_eq!(*links.borrow(), vec!["/projects/42".to_string()]);
        // Background clicks are reported for every click, hit or not.
        assert_eq!(*backgrounds.borrow(), 2);

        project.teardown();
        map.click(ScreenPoint::new(10.0, 10.0), LngLat::default());
        assert_eq!(links.borrow().len(), 1);
    }

    #[test]
    fn project_click_claims_cursor_while_hovered() {
        let map = map();
        let project = ProjectClick::subscribe(
            &bridge(&map),
            LayerGroup::single("projects"),
            ProjectClickOptions::default(),
        )
        .expect("subscribed");

        map.move_pointer(ScreenPoint::new(10.0, 10.0), LngLat::default());
        assert_eq!(map.cursor(), Cursor::Pointer);

        project.teardown();
        assert_eq!(map.cursor(), Cursor::Default);
        assert_eq!(map.listener_count(), 0);
    }

    #[test]
    fn missing_href_is_ignored() {
        let map = Rc::new(HeadlessMap::new());
        map.add_layer("projects", "projects-src");
        map.draw(
            "projects",
            ScreenPoint::new(0.0, 0.0),
            5.0,
            Feature::point(LngLat::default(), Properties::default()),
        );
        let called = Rc::new(RefCell::new(false));
        let c = called.clone();
        let _project = ProjectClick::subscribe(
            &bridge(&map),
            LayerGroup::single("projects"),
            ProjectClickOptions::default().on_project_click(move |_| *c.borrow_mut() = true),
        )
        .expect("subscribed");

        map.click(ScreenPoint::new(0.0, 0.0), LngLat::default());
        assert!(!*called.borrow());
    }
}
