use serde::{Deserialize, Serialize};

/// Identifier of a styled layer registered with the map engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a data source feeding one or more layers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    EmptyGroup,
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::EmptyGroup => write!(f, "layer group must name at least one layer"),
        }
    }
}

impl std::error::Error for LayerError {}

/// Ordered, non-empty set of layers sharing one popup.
///
/// Duplicate ids are dropped, keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerGroup {
    layers: Vec<LayerId>,
}

impl LayerGroup {
    pub fn new<I, L>(layers: I) -> Result<Self, LayerError>
    where
        I: IntoIterator<Item = L>,
        L: Into<LayerId>,
    {
        let mut out: Vec<LayerId> = Vec::new();
        for layer in layers {
            let layer = layer.into();
            if !out.contains(&layer) {
                out.push(layer);
            }
        }
        if out.is_empty() {
            return Err(LayerError::EmptyGroup);
        }
        Ok(Self { layers: out })
    }

    pub fn single(layer: impl Into<LayerId>) -> Self {
        Self {
            layers: vec![layer.into()],
        }
    }

    pub fn layers(&self) -> &[LayerId] {
        &self.layers
    }

    pub fn contains(&self, layer: &LayerId) -> bool {
        self.layers.contains(layer)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Display for LayerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(layer.as_str())?;
        }
        Ok(())
    }
}
