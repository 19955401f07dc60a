//! Licence-plate detection with Haar cascade classifiers.
//!
//! Camera or decoded frames go through [`pipeline::plate_pipeline`], which
//! normalises colour, resizes, runs the cascade search and draws the hits.

pub mod annotation;
pub mod detection;
pub mod imaging;
pub mod io;
pub mod pipeline;
pub mod shared;
