//! Configuration section definitions.
//!
//! Each module corresponds to a section in `redirkit.toml`:
//!
//! | Module  | TOML Section | Purpose                                    |
//! |---------|--------------|--------------------------------------------|
//! | `build` | `[build]`    | Paths, fetch limits, parallelism           |
//! | `site`  | `[site]`     | Public base URL, encrypted state file name |
//! | `state` | `[state]`    | Key source, previous state location        |

mod build;
mod site;
mod state;

pub use build::BuildSectionConfig;
pub use site::SiteSectionConfig;
pub use state::StateSectionConfig;
