pub mod bessel;
pub mod linear_solver;
pub mod special;

pub use bessel::{i0, i0e, i1, i1e};
pub use special::{f_distribution_sf, ln_gamma, regularized_incomplete_beta};
