//! Line-of-sight and cover evaluation

pub mod cover;
pub mod los;

pub use cover::{cover_against, cover_at};
pub use los::{accumulated_opacity, can_see, SightParams};
