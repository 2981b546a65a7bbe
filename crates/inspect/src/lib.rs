//! Hover and click inspection of map features.
//!
//! Pointer events from a [`layers::MapEngine`] flow through a
//! [`PointerBridge`] into a per-group [`HoverStore`]; the store's feature is
//! projected into popup markup and shown through a [`PopupPresenter`].
//! Cluster clicks bypass the store and zoom the camera instead.

pub mod bridge;
pub mod click;
pub mod cluster;
pub mod compose;
pub mod config;
pub mod error;
pub mod highlight;
pub mod hover;
pub mod inspector;
pub mod markup;
pub mod pointer;
pub mod popup;
pub mod projection;

#[cfg(test)]
mod testing;

pub use bridge::{HoverSubscription, PointerBridge};
pub use click::{ClickRouter, ClickSubscription, ProjectClick, ProjectClickOptions};
pub use cluster::{ClusterSummary, ClusterZoom, summarize};
pub use compose::{InspectPopup, PopupContent};
pub use config::{ConfigError, KeyAliasConfig};
pub use error::InspectError;
pub use highlight::HoverHighlight;
pub use hover::{HoverFeature, HoverStore, WatchId, WeakHoverStore};
pub use inspector::Inspector;
pub use markup::{escape_html, render_cluster_popup, render_feature_popup};
pub use pointer::{ClaimToken, PointerAffordance};
pub use popup::{Anchor, CloseHandler, PopupOptions, PopupPresenter, PopupStyle, PopupWidget};
pub use projection::{Attribute, ProjectedData, field_text, project};
