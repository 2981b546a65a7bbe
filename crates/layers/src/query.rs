use foundation::geo::ScreenPoint;

use crate::feature::Feature;
use crate::layer::LayerId;

/// A feature as drawn on screen: a circular hit region in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer: LayerId,
    pub anchor: ScreenPoint,
    pub radius_px: f64,
    pub feature: Feature,
}

impl RenderedFeature {
    fn hit(&self, point: ScreenPoint) -> bool {
        let dx = point.x - self.anchor.x;
        let dy = point.y - self.anchor.y;
        dx * dx + dy * dy <= self.radius_px * self.radius_px
    }
}

/// Screen-space hit index over drawn features.
///
/// Ordering contract:
/// - Features are stored in draw order; later draws sit on top.
/// - Queries return top-most first.
#[derive(Debug, Default, Clone)]
pub struct RenderedIndex {
    items: Vec<RenderedFeature>,
}

impl RenderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: RenderedFeature) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn query(&self, point: ScreenPoint, layers: Option<&[LayerId]>) -> Vec<Feature> {
        self.items
            .iter()
            .rev()
            .filter(|r| layers.is_none_or(|ls| ls.contains(&r.layer)))
            .filter(|r| r.hit(point))
            .map(|r| r.feature.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderedFeature, RenderedIndex};
    use crate::feature::{Feature, FeatureId, Properties};
    use crate::layer::LayerId;
    use foundation::geo::{LngLat, ScreenPoint};

    fn drawn(layer: &str, x: f64, id: i64) -> RenderedFeature {
        RenderedFeature {
            layer: LayerId::new(layer),
            anchor: ScreenPoint::new(x, 0.0),
            radius_px: 5.0,
            feature: Feature::point(LngLat::default(), Properties::default())
                .with_id(FeatureId::Number(id)),
        }
    }

    fn ids(features: &[Feature]) -> Vec<i64> {
        features
            .iter()
            .filter_map(|f| match f.id {
                Some(FeatureId::Number(n)) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn returns_top_most_first() {
        let mut index = RenderedIndex::new();
        index.push(drawn("a", 0.0, 1));
        index.push(drawn("b", 2.0, 2));
        index.push(drawn("a", 50.0, 3));

        let hits = index.query(ScreenPoint::new(1.0, 0.0), None);
        assert_eq!(ids(&hits), vec![2, 1]);
    }

    #[test]
    fn filters_by_layer() {
        let mut index = RenderedIndex::new();
        index.push(drawn("a", 0.0, 1));
        index.push(drawn("b", 0.0, 2));

        let only_a = [LayerId::new("a")];
        let hits = index.query(ScreenPoint::new(0.0, 0.0), Some(&only_a));
        assert_eq!(ids(&hits), vec![1]);
        assert!(index.query(ScreenPoint::new(40.0, 0.0), None).is_empty());
    }
}
