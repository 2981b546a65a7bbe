pub mod arena;
pub mod geo;
pub mod handles;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use geo::*;
pub use handles::*;
