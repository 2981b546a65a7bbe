use foundation::geo::LngLat;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::layer::{LayerId, SourceId};

/// Scalar value of a feature property bag.
///
/// Nested arrays/objects coming from the host are kept as their JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Host-side truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Null => false,
            PropertyValue::Bool(b) => *b,
            PropertyValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PropertyValue::String(s) => !s.is_empty(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(PropertyValue::Number)
                .unwrap_or_else(|| PropertyValue::String(n.to_string())),
            serde_json::Value::String(s) => PropertyValue::String(s),
            other => PropertyValue::String(other.to_string()),
        }
    }
}

/// Formats like the host's string conversion: integral numbers have no
/// fraction and `Null` prints as `null`.
impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => fmt_number(*n, f),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

// Shortest round-trip digits, laid out the way the host prints numbers:
// positional between 1e-7 and 1e21, exponential (`1e-7`, `1.5e+21`) outside.
fn fmt_number(n: f64, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        // Covers -0.
        return f.write_str("0");
    }

    let sci = format!("{:e}", n.abs());
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return write!(f, "{n}");
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return write!(f, "{n}");
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exp + 1;

    if n < 0.0 {
        f.write_str("-")?;
    }
    if k <= point && point <= 21 {
        write!(f, "{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        write!(f, "{int}.{frac}")
    } else if -6 < point && point <= 0 {
        write!(f, "0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let (first, rest) = digits.split_at(1);
        let sign = if point > 0 { '+' } else { '-' };
        if rest.is_empty() {
            write!(f, "{first}e{sign}{}", (point - 1).abs())
        } else {
            write!(f, "{first}.{rest}e{sign}{}", (point - 1).abs())
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Null => serializer.serialize_unit(),
            PropertyValue::Bool(b) => serializer.serialize_bool(*b),
            PropertyValue::Number(n) => serializer.serialize_f64(*n),
            PropertyValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(PropertyValue::from_json)
    }
}

/// Flat property bag of a feature.
///
/// Iteration order is the order keys were encountered in the source data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    pub pairs: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn new(pairs: Vec<(String, PropertyValue)>) -> Self {
        Self { pairs }
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Like [`Properties::get`], but treats `null` as absent.
    pub fn present(&self, key: &str) -> Option<&PropertyValue> {
        self.get(key).filter(|v| !v.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> + '_ {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (k, v) in &self.pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct PropertiesVisitor;

impl<'de> Visitor<'de> for PropertiesVisitor {
    type Value = Properties;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a flat property object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, PropertyValue>()? {
            pairs.push((k, v));
        }
        Ok(Properties { pairs })
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PropertiesVisitor)
    }
}

/// Engine-side feature identifier used for feature state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LngLat),
    LineString(Vec<LngLat>),
    Polygon(Vec<Vec<LngLat>>),
    /// Geometry kinds the inspection pipeline never positions popups on.
    Other(String),
}

impl Geometry {
    pub fn as_point(&self) -> Option<LngLat> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

fn positions(value: &serde_json::Value) -> Option<Vec<LngLat>> {
    value
        .as_array()?
        .iter()
        .map(|p| {
            let coords: Vec<f64> = p.as_array()?.iter().filter_map(|c| c.as_f64()).collect();
            LngLat::from_coordinates(&coords)
        })
        .collect()
}

impl From<RawGeometry> for Geometry {
    fn from(raw: RawGeometry) -> Self {
        let parsed = match raw.kind.as_str() {
            "Point" => raw
                .coordinates
                .as_array()
                .map(|a| a.iter().filter_map(|c| c.as_f64()).collect::<Vec<f64>>())
                .and_then(|c| LngLat::from_coordinates(&c))
                .map(Geometry::Point),
            "LineString" => positions(&raw.coordinates).map(Geometry::LineString),
            "Polygon" => raw
                .coordinates
                .as_array()
                .and_then(|rings| rings.iter().map(positions).collect::<Option<Vec<_>>>())
                .map(Geometry::Polygon),
            _ => None,
        };
        parsed.unwrap_or(Geometry::Other(raw.kind))
    }
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawGeometry::deserialize(deserializer).map(Geometry::from)
    }
}

#[derive(Deserialize)]
struct RawLayerRef {
    id: LayerId,
}

fn layer_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LayerId>, D::Error> {
    Ok(Option::<RawLayerRef>::deserialize(deserializer)?.map(|l| l.id))
}

/// A feature as delivered by the engine: geometry, property bag, and where it
/// was rendered from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<FeatureId>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default)]
    pub source: Option<SourceId>,
    #[serde(default, deserialize_with = "layer_ref")]
    pub layer: Option<LayerId>,
}

impl Feature {
    pub fn point(position: LngLat, properties: Properties) -> Self {
        Self {
            id: None,
            geometry: Some(Geometry::Point(position)),
            properties: Some(properties),
            source: None,
            layer: None,
        }
    }

    pub fn with_id(mut self, id: FeatureId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn without_properties(mut self) -> Self {
        self.properties = None;
        self
    }

    pub fn point_position(&self) -> Option<LngLat> {
        self.geometry.as_ref().and_then(Geometry::as_point)
    }
}
