//! Per-platform extraction strategies.
//!
//! Each handler runs a fixed list of fallback tiers; a tier's failure is
//! caught locally and the next tier runs. A recognized platform never
//! produces an all-empty result: when every tier misses, a deterministic
//! stub with a fixed title and the platform favicon is returned instead.

pub mod ecommerce;
pub mod reddit;
pub mod tiktok;
pub mod youtube;
