use layers::{EngineError, LayerId};

/// Errors raised while wiring the pipeline to a map.
///
/// Runtime failures (missing properties, failed cluster lookups) never
/// surface here; they degrade to "nothing shown".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectError {
    UnknownLayer(LayerId),
    Engine(EngineError),
}

impl std::fmt::Display for InspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectError::UnknownLayer(id) => {
                write!(f, "layer {id} is not registered with the map")
            }
            InspectError::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for InspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InspectError::Engine(err) => Some(err),
            InspectError::UnknownLayer(_) => None,
        }
    }
}

impl From<EngineError> for InspectError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownLayer(id) => InspectError::UnknownLayer(id),
            other => InspectError::Engine(other),
        }
    }
}
