pub mod engine;
pub mod feature;
pub mod headless;
pub mod layer;
pub mod query;

pub use engine::*;
pub use feature::*;
pub use layer::*;
