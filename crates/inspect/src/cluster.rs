use std::rc::{Rc, Weak};

use foundation::geo::ScreenPoint;
use layers::{CameraTarget, LayerGroup, MapEngine, Properties};
use tracing::debug;

use crate::click::{ClickRouter, ClickSubscription};
use crate::error::InspectError;

pub const POINT_COUNT_KEY: &str = "point_count";
pub const CLUSTER_ID_KEY: &str = "cluster_id";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClusterSummary {
    pub point_count: u64,
}

/// Cluster popup content; absent unless the bag has a truthy numeric
/// `point_count`.
pub fn summarize(properties: Option<&Properties>) -> Option<ClusterSummary> {
    let count = properties?
        .get(POINT_COUNT_KEY)
        .filter(|v| v.is_truthy())?
        .as_f64()
        .filter(|n| n.is_finite() && *n > 0.0)?;
    Some(ClusterSummary {
        point_count: count as u64,
    })
}

/// Zooms the camera into a cluster when it is clicked.
#[derive(Clone)]
pub struct ClusterZoom {
    engine: Rc<dyn MapEngine>,
    group: LayerGroup,
}

impl ClusterZoom {
    pub fn new(engine: Rc<dyn MapEngine>, group: LayerGroup) -> Self {
        Self { engine, group }
    }

    pub fn group(&self) -> &LayerGroup {
        &self.group
    }

    /// Resolves the cluster under `point` and eases the camera to its
    /// expansion zoom once the engine answers.
    ///
    /// Returns whether a lookup was issued. Clicks off any cluster, clusters
    /// without id, source or point geometry, and failed lookups move nothing.
    pub fn handle_click(&self, point: ScreenPoint) -> bool {
        let features = self
            .engine
            .query_rendered_features(point, Some(self.group.layers()));
        let Some(feature) = features.first() else {
            return false;
        };

        let cluster_id = feature
            .properties
            .as_ref()
            .and_then(|p| p.get(CLUSTER_ID_KEY))
            .and_then(|v| v.as_f64())
            .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0);
        let (Some(cluster_id), Some(source), Some(center)) =
            (cluster_id, feature.source.clone(), feature.point_position())
        else {
            debug!(group = %self.group, "clicked feature is not a resolvable cluster");
            return false;
        };
        let cluster_id = cluster_id as u64;

        let engine: Weak<dyn MapEngine> = Rc::downgrade(&self.engine);
        let lookup_source = source.clone();
        self.engine.cluster_expansion_zoom(
            &source,
            cluster_id,
            Box::new(move |result| match result {
                Ok(zoom) if zoom.is_finite() => {
                    if let Some(engine) = engine.upgrade() {
                        debug!(source = %lookup_source, cluster_id, zoom, "easing to cluster");
                        engine.ease_to(CameraTarget { center, zoom });
                    }
                }
                Ok(zoom) => {
                    debug!(
                        source = %lookup_source,
                        cluster_id,
                        zoom,
                        "ignoring non-finite expansion zoom"
                    );
                }
                Err(err) => {
                    debug!(
                        source = %lookup_source,
                        cluster_id,
                        error = %err,
                        "expansion zoom lookup failed"
                    );
                }
            }),
        );
        true
    }

    /// Wires [`ClusterZoom::handle_click`] to clicks on the group's layers.
    pub fn subscribe_clicks(&self) -> Result<ClickSubscription, InspectError> {
        let zoom = self.clone();
        ClickRouter::new(self.engine.clone()).on_layer_click(&self.group, move |event| {
            zoom.handle_click(event.point);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{ClusterSummary, ClusterZoom, summarize};
    use foundation::geo::{LngLat, ScreenPoint};
    use layers::headless::HeadlessMap;
    use layers::{CameraTarget, Feature, Geometry, LayerGroup, Properties, PropertyValue};
    use pretty_assertions::assert_eq;

    fn props(raw: &str) -> Properties {
        Properties::from_json(raw).expect("valid properties")
    }

    fn clustered_map() -> Rc<HeadlessMap> {
        let map = Rc::new(HeadlessMap::new());
        map.add_layer("clusters-birds", "birds");
        map.set_clustered("birds");
        map.set_expansion_zoom("birds", 7, 9.5);
        map.draw(
            "clusters-birds",
            ScreenPoint::new(50.0, 50.0),
            10.0,
            Feature::point(
                LngLat::new(33.1, 68.9),
                props(r#"{"cluster": true, "cluster_id": 7, "point_count": 12}"#),
            ),
        );
        map
    }

    #[test]
    fn summary_requires_truthy_count() {
        assert_eq!(
            summarize(Some(&props(r#"{"point_count": 12}"#))),
            Some(ClusterSummary { point_count: 12 })
        );
        assert_eq!(summarize(Some(&props(r#"{"point_count": 0}"#))), None);
        assert_eq!(summarize(Some(&props(r#"{"point_count": null}"#))), None);
        assert_eq!(summarize(Some(&props(r#"{"cluster_id": 3}"#))), None);
        assert_eq!(summarize(None), None);
    }

    #[test]
    fn click_on_nothing_moves_nothing() {
        let map = clustered_map();
        let zoom = ClusterZoom::new(map.clone(), LayerGroup::single("clusters-birds"));

        assert!(!zoom.handle_click(ScreenPoint::new(300.0, 300.0)));
        map.flush_async();
        assert!(map.camera_moves().is_empty());
    }

    #[test]
    fn click_on_cluster_eases_after_lookup() {
        let map = clustered_map();
        let zoom = ClusterZoom::new(map.clone(), LayerGroup::single("clusters-birds"));

        assert!(zoom.handle_click(ScreenPoint::new(52.0, 48.0)));
        // The lookup is asynchronous.
        assert!(map.camera_moves().is_empty());
        assert_eq!(map.flush_async(), 1);
        assert_eq!(
            map.camera_moves(),
            vec![CameraTarget {
                center: LngLat::new(33.1, 68.9),
                zoom: 9.5,
            }]
        );
    }

    #[test]
    fn failed_lookup_moves_nothing() {
        let map = clustered_map();
        map.clear_drawn();
        map.draw(
            "clusters-birds",
            ScreenPoint::new(50.0, 50.0),
            10.0,
            Feature::point(LngLat::default(), props(r#"{"cluster_id": 99, "point_count": 3}"#)),
        );
        let zoom = ClusterZoom::new(map.clone(), LayerGroup::single("clusters-birds"));

        assert!(zoom.handle_click(ScreenPoint::new(50.0, 50.0)));
        map.flush_async();
        assert!(map.camera_moves().is_empty());
    }

    #[test]
    fn unresolvable_features_are_skipped() {
        let map = clustered_map();
        map.clear_drawn();
        map.draw(
            "clusters-birds",
            ScreenPoint::new(0.0, 0.0),
            10.0,
            Feature::point(
                LngLat::default(),
                [("cluster_id", PropertyValue::String("x".into()))]
                    .into_iter()
                    .collect(),
            ),
        );
        map.draw(
            "clusters-birds",
            ScreenPoint::new(100.0, 0.0),
            10.0,
            Feature::point(LngLat::default(), props(r#"{"cluster_id": 7}"#))
                .with_geometry(Geometry::Other("MultiPoint".into())),
        );
        let zoom = ClusterZoom::new(map.clone(), LayerGroup::single("clusters-birds"));

        assert!(!zoom.handle_click(ScreenPoint::new(0.0, 0.0)));
        assert!(!zoom.handle_click(ScreenPoint::new(100.0, 0.0)));
    }

    #[test]
    fn subscribed_clicks_zoom_until_torn_down() {
        let map = clustered_map();
        let zoom = ClusterZoom::new(map.clone(), LayerGroup::single("clusters-birds"));
        let sub = zoom.subscribe_clicks().expect("subscribed");

        map.click(ScreenPoint::new(50.0, 50.0), LngLat::default());
        map.flush_async();
        assert_eq!(map.camera_moves().len(), 1);

        sub.teardown();
        map.click(ScreenPoint::new(50.0, 50.0), LngLat::default());
        map.flush_async();
        assert_eq!(map.camera_moves().len(), 1);
        assert_eq!(map.listener_count(), 0);
    }
}
