pub mod align;
pub mod cancel;
pub mod consts;
pub mod detection;
pub mod error;
pub mod events;
pub mod filters;
pub mod frame;
pub mod io;
pub mod kinetics;
pub mod mask;
pub mod math;
pub mod pipeline;
pub mod regions;
pub mod series;
pub mod trace;
