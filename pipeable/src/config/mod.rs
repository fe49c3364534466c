//! Layered settings.
//!
//! Three JSON tiers (site, project, user) are merged by [`SettingsNode::resolve`]
//! and string values are rendered as templates against keys resolved before them.

mod loader;
mod settings;
mod template;

pub use loader::{read_tier, SettingsLoader};
pub use settings::{SettingValue, SettingsNode};
