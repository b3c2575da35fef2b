//! Small helpers shared across the generator.

pub mod html;
pub mod path;
mod plural;
pub mod write;

pub use plural::plural_count;
