use std::cell::RefCell;
use std::rc::Rc;

use layers::LayerGroup;
use tracing::debug;

use crate::bridge::{HoverSubscription, PointerBridge};
use crate::cluster::summarize;
use crate::config::KeyAliasConfig;
use crate::error::InspectError;
use crate::hover::{HoverFeature, HoverStore, WatchId};
use crate::markup::{render_cluster_popup, render_feature_popup};
use crate::popup::{PopupPresenter, PopupWidget};
use crate::projection::project;

/// What an [`InspectPopup`] renders for the hovered feature.
#[derive(Debug, Clone)]
pub enum PopupContent {
    /// Header, location and attribute table projected through the aliases.
    Feature(Rc<KeyAliasConfig>),
    /// Point count of a cluster; non-cluster features show nothing.
    Cluster,
}

impl PopupContent {
    fn render(&self, feature: &HoverFeature) -> Option<String> {
        match self {
            PopupContent::Feature(aliases) => {
                project(Some(&feature.properties), aliases).map(|data| render_feature_popup(&data))
            }
            PopupContent::Cluster => {
                summarize(Some(&feature.properties)).map(|summary| render_cluster_popup(&summary))
            }
        }
    }
}

/// Hover popup for one layer group: pointer bridge, hover store, markup and
/// presenter wired together for the lifetime of the value.
pub struct InspectPopup<W: PopupWidget + 'static> {
    subscription: HoverSubscription,
    store: HoverStore,
    presenter: Rc<PopupPresenter<W>>,
    watch: WatchId,
    content: Rc<RefCell<Option<String>>>,
}

impl<W: PopupWidget + 'static> InspectPopup<W> {
    pub fn features(
        bridge: &PointerBridge,
        group: LayerGroup,
        aliases: Rc<KeyAliasConfig>,
        presenter: PopupPresenter<W>,
    ) -> Result<Self, InspectError> {
        Self::mount(bridge, group, PopupContent::Feature(aliases), presenter)
    }

    pub fn clusters(
        bridge: &PointerBridge,
        group: LayerGroup,
        presenter: PopupPresenter<W>,
    ) -> Result<Self, InspectError> {
        Self::mount(bridge, group, PopupContent::Cluster, presenter)
    }

    pub fn mount(
        bridge: &PointerBridge,
        group: LayerGroup,
        kind: PopupContent,
        presenter: PopupPresenter<W>,
    ) -> Result<Self, InspectError> {
        let subscription = bridge.subscribe(group)?;
        let store = HoverStore::new();
        subscription.bind(&store);

        let presenter = Rc::new(presenter);
        let content = Rc::new(RefCell::new(None));

        let weak_presenter = Rc::downgrade(&presenter);
        let weak_store = store.downgrade();
        let shown = content.clone();
        let watch = store.watch(move |feature| {
            let Some(presenter) = weak_presenter.upgrade() else {
                return;
            };
            let html = feature.and_then(|f| kind.render(f).map(|html| (f.position, html)));
            match html {
                Some((position, html)) => {
                    let close_store = weak_store.clone();
                    presenter.show(position, &html, Rc::new(move || close_store.clear()));
                    *shown.borrow_mut() = Some(html);
                }
                None => {
                    presenter.hide();
                    shown.borrow_mut().take();
                }
            }
        });

        debug!(group = %subscription.group(), "popup mounted");
        Ok(Self {
            subscription,
            store,
            presenter,
            watch,
            content,
        })
    }

    pub fn group(&self) -> &LayerGroup {
        self.subscription.group()
    }

    pub fn store(&self) -> &HoverStore {
        &self.store
    }

    pub fn presenter(&self) -> &PopupPresenter<W> {
        &self.presenter
    }

    /// Markup currently on screen.
    pub fn content(&self) -> Option<String> {
        self.content.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stops listening and removes the popup. Idempotent.
    pub fn unmount(&self) {
        if !self.subscription.is_active() {
            return;
        }
        self.subscription.teardown();
        self.store.unwatch(self.watch);
        self.presenter.hide();
        self.content.borrow_mut().take();
        debug!(group = %self.subscription.group(), "popup unmounted");
    }
}

impl<W: PopupWidget + 'static> Drop for InspectPopup<W> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::InspectPopup;
    use crate::bridge::PointerBridge;
    use crate::config::KeyAliasConfig;
    use crate::pointer::PointerAffordance;
    use crate::popup::{PopupOptions, PopupPresenter};
    use crate::testing::RecordingWidget;
    use foundation::geo::{LngLat, ScreenPoint};
    use layers::headless::HeadlessMap;
    use layers::{Cursor, Feature, LayerGroup, LayerId, PointerEvent, PointerEventKind, Properties};
    use pretty_assertions::assert_eq;
    use runtime::{Frame, PhaseScheduler};

    struct Fixture {
        map: Rc<HeadlessMap>,
        bridge: PointerBridge,
        scheduler: Rc<PhaseScheduler>,
    }

    impl Fixture {
        fn new() -> Self {
            let map = Rc::new(HeadlessMap::new());
            map.add_layer("unclustered-point-birds", "birds");
            map.add_layer("clusters-birds", "birds");
            let affordance = Rc::new(PointerAffordance::new(map.clone()));
            Self {
                bridge: PointerBridge::new(map.clone(), affordance),
                map,
                scheduler: Rc::new(PhaseScheduler::new()),
            }
        }

        fn presenter(&self) -> PopupPresenter<RecordingWidget> {
            PopupPresenter::new(
                RecordingWidget::default(),
                PopupOptions::default(),
                self.scheduler.clone(),
            )
        }

        fn draw(&self, layer: &str, x: f64, raw: &str) {
            self.map.draw(
                layer,
                ScreenPoint::new(x, 0.0),
                5.0,
                Feature::point(
                    LngLat::new(x, 68.0),
                    Properties::from_json(raw).expect("valid properties"),
                ),
            );
        }

        fn hover(&self, x: f64) {
            self.map.move_pointer(ScreenPoint::new(x, 0.0), LngLat::new(x, 68.0));
        }
    }

    fn feature_popup(f: &Fixture) -> InspectPopup<RecordingWidget> {
        InspectPopup::features(
            &f.bridge,
            LayerGroup::single("unclustered-point-birds"),
            Rc::new(KeyAliasConfig::default()),
            f.presenter(),
        )
        .expect("mounted")
    }

    #[test]
    fn hover_shows_projected_popup_and_leave_hides_it() {
        let f = Fixture::new();
        f.draw("unclustered-point-birds", 0.0, r#"{"тип": "г", "нп": "Кола"}"#);
        let popup = feature_popup(&f);

        f.hover(0.0);
        let html = popup.content().expect("popup shown");
        assert!(html.starts_with("<h2 class=\"popup-header\">г. Кола</h2>"));
        popup.presenter().with_widget(|w| {
            assert_eq!(w.position, Some(LngLat::new(0.0, 68.0)));
            assert_eq!(w.html, html);
        });
        assert_eq!(f.map.cursor(), Cursor::Pointer);

        f.hover(100.0);
        assert_eq!(popup.content(), None);
        assert!(!popup.presenter().is_shown());
        assert_eq!(popup.store().current(), None);
        assert_eq!(f.map.cursor(), Cursor::Default);
    }

    #[test]
    fn moving_between_features_reuses_the_popup() {
        let f = Fixture::new();
        f.draw("unclustered-point-birds", 0.0, r#"{"нп": "Кола"}"#);
        f.draw("unclustered-point-birds", 8.0, r#"{"нп": "Кировск"}"#);
        let popup = feature_popup(&f);

        f.hover(0.0);
        f.hover(8.0);
        popup.presenter().with_widget(|w| {
            assert_eq!(w.mounts, 1);
            assert!(w.html.contains("Кировск"));
        });
        // Width is re-applied once per mount.
        assert_eq!(f.scheduler.run_frame(Frame::new(0)).layout_jobs, 1);
    }

    #[test]
    fn null_properties_show_nothing() {
        let f = Fixture::new();
        f.map.draw(
            "unclustered-point-birds",
            ScreenPoint::new(0.0, 0.0),
            5.0,
            Feature::point(LngLat::default(), Properties::default()).without_properties(),
        );
        let popup = feature_popup(&f);

        f.hover(0.0);
        assert_eq!(popup.content(), None);
        assert!(popup.store().current().is_none());
    }

    #[test]
    fn closing_the_widget_clears_the_store() {
        let f = Fixture::new();
        f.draw("unclustered-point-birds", 0.0, r#"{"нп": "Кола"}"#);
        let popup = feature_popup(&f);
        f.hover(0.0);

        let close = popup.presenter().with_widget(|w| w.close_handler());
        close();
        assert_eq!(popup.store().current(), None);
        assert_eq!(popup.content(), None);
    }

    #[test]
    fn cluster_popup_shows_counts_only_for_clusters() {
        let f = Fixture::new();
        f.draw("clusters-birds", 0.0, r#"{"cluster_id": 1, "point_count": 17}"#);
        f.draw("clusters-birds", 20.0, r#"{"cluster_id": 2, "point_count": 0}"#);
        let popup = InspectPopup::clusters(
            &f.bridge,
            LayerGroup::single("clusters-birds"),
            f.presenter(),
        )
        .expect("mounted");

        f.hover(0.0);
        assert_eq!(
            popup.content().as_deref(),
            Some("<div class=\"cluster-popup-count\">17</div>")
        );

        f.hover(20.0);
        assert_eq!(popup.content(), None);
        assert!(!popup.presenter().is_shown());
    }

    #[test]
    fn unmount_while_hovered_removes_everything() {
        let f = Fixture::new();
        f.draw("unclustered-point-birds", 0.0, r#"{"нп": "Кола"}"#);
        let popup = feature_popup(&f);
        f.hover(0.0);

        popup.unmount();
        popup.unmount();
        assert!(!popup.is_mounted());
        assert_eq!(popup.store().current(), None);
        popup.presenter().with_widget(|w| assert_eq!(w.removals, 1));
        assert_eq!(f.map.listener_count(), 0);
        assert_eq!(f.map.cursor(), Cursor::Default);
    }

    #[test]
    fn groups_are_independent() {
        let f = Fixture::new();
        f.draw("unclustered-point-birds", 0.0, r#"{"нп": "Кола"}"#);
        f.draw("clusters-birds", 50.0, r#"{"point_count": 3}"#);
        let points = feature_popup(&f);
        let clusters = InspectPopup::clusters(
            &f.bridge,
            LayerGroup::single("clusters-birds"),
            f.presenter(),
        )
        .expect("mounted");

        f.hover(0.0);
        assert!(points.content().is_some());
        assert_eq!(clusters.content(), None);

        drop(points);
        f.map.emit(
            PointerEventKind::Move,
            &LayerId::new("unclustered-point-birds"),
            &PointerEvent::new(ScreenPoint::default(), LngLat::default()),
        );
        f.hover(50.0);
        assert!(clusters.content().is_some());
        assert_eq!(f.map.listener_count(), 2);
    }
}
