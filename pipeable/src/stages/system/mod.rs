//! Host-agnostic stages registered under the `"system"` host.
//!
//! These double as reference implementations of the [`Stage`](super::Stage)
//! contract.

mod check_unique_names;
mod collect_files;
mod log_context;
mod static_input;
mod write_manifest;

pub use check_unique_names::CheckUniqueNames;
pub use collect_files::CollectFiles;
pub use log_context::LogContext;
pub use static_input::StaticInput;
pub use write_manifest::WriteManifest;

use crate::errors::DuplicateStageError;
use crate::registry::StageRegistry;

/// Registers every system stage.
pub fn register_all(registry: &StageRegistry) -> Result<(), DuplicateStageError> {
    registry.register::<CollectFiles>()?;
    registry.register::<CheckUniqueNames>()?;
    registry.register::<StaticInput>()?;
    registry.register::<WriteManifest>()?;
    registry.register::<LogContext>()?;
    Ok(())
}
