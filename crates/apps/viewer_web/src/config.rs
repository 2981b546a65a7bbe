use inspect::{InspectError, KeyAliasConfig, PopupOptions};
use layers::{LayerError, LayerGroup};
use serde::Deserialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupKind {
    Feature,
    Cluster,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopupMount {
    pub kind: PopupKind,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HighlightMount {
    pub source: String,
    pub layer: String,
}

/// Everything mounted on one map, as handed over by the page.
///
/// ```json
/// {
///   "popups": [{"kind": "feature", "layers": ["unclustered-point-birds"]}],
///   "cluster_zoom": [["clusters-birds"]],
///   "highlights": [{"source": "russia-states", "layer": "russia-states-border"}],
///   "project_layers": ["projects"],
///   "popup": {"style": {"max_width_px": 400}},
///   "aliases": {"city_name": "нп"}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub popups: Vec<PopupMount>,
    pub cluster_zoom: Vec<Vec<String>>,
    pub highlights: Vec<HighlightMount>,
    pub project_layers: Vec<String>,
    pub popup: PopupOptions,
    pub aliases: KeyAliasConfig,
}

impl MountConfig {
    pub fn from_json(raw: &str) -> Result<Self, MountError> {
        serde_json::from_str(raw).map_err(|e| MountError::Config(e.to_string()))
    }
}

pub fn group(layers: &[String]) -> Result<LayerGroup, MountError> {
    Ok(LayerGroup::new(layers.iter().map(String::as_str))?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum MountError {
    Config(String),
    Layer(LayerError),
    Inspect(InspectError),
}

impl std::fmt::Display for MountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountError::Config(msg) => write!(f, "invalid mount config: {msg}"),
            MountError::Layer(err) => write!(f, "{err}"),
            MountError::Inspect(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MountError {}

impl From<LayerError> for MountError {
    fn from(err: LayerError) -> Self {
        MountError::Layer(err)
    }
}

impl From<InspectError> for MountError {
    fn from(err: InspectError) -> Self {
        MountError::Inspect(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{MountConfig, MountError, PopupKind, group};
    use layers::LayerError;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = MountConfig::from_json("{}").expect("config");
        assert!(cfg.popups.is_empty());
        assert_eq!(cfg.popup.class_name, "my-popup");
        assert_eq!(cfg.popup.style.max_width_px, Some(400.0));
        assert_eq!(cfg.aliases.city_name, "нп");
    }

    #[test]
    fn parses_mounts() {
        let cfg = MountConfig::from_json(
            r#"{
                "popups": [
                    {"kind": "feature", "layers": ["unclustered-point-birds"]},
                    {"kind": "cluster", "layers": ["clusters-birds", "clusters-fish"]}
                ],
                "cluster_zoom": [["clusters-birds"]],
                "popup": {"style": {"max_width_px": 320}},
                "aliases": {"population": "pop"}
            }"#,
        )
        .expect("config");

        assert_eq!(cfg.popups.len(), 2);
        assert_eq!(cfg.popups[1].kind, PopupKind::Cluster);
        assert_eq!(cfg.popup.style.max_width_px, Some(320.0));
        assert_eq!(cfg.popup.class_name, "my-popup");
        assert_eq!(cfg.aliases.population, "pop");
        assert_eq!(cfg.aliases.region, "регион");
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = MountConfig::from_json("{\"popups\": 3}").expect_err("rejected");
        assert!(matches!(err, MountError::Config(_)));
    }

    #[test]
    fn empty_layer_list_is_rejected() {
        assert_eq!(group(&[]), Err(MountError::Layer(LayerError::EmptyGroup)));
    }
}
