//! Individual enhancement stages

pub mod contrast;
pub mod sharpen;
pub mod upscale;
