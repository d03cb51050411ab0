pub mod components;
pub mod morphology;
pub mod threshold;

pub use components::{connected_components, Component};
pub use threshold::{Histogram, OtsuSplit};
