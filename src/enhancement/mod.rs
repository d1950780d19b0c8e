//! Image enhancement pipeline
//!
//! Lanczos upscaling, CLAHE on the L*a*b* luminance channel, then unsharp
//! masking. Every stage is a pure function from one RGB buffer to a new one.

pub mod clahe;
pub mod lab;
pub mod pipeline;
pub mod steps;

pub use pipeline::{EnhancementResult, Pipeline, ScaleFactor};
