/// Geographic position in degrees, `[lon, lat]` order.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Builds a position from a GeoJSON coordinate array.
    ///
    /// Extra elements (altitude) are ignored; fewer than two elements yields `None`.
    pub fn from_coordinates(coords: &[f64]) -> Option<Self> {
        match coords {
            [lon, lat, ..] => Some(Self::new(*lon, *lat)),
            _ => None,
        }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Pixel position relative to the map canvas, origin top-left.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
