//! Core domain model types for pipeable.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stage categories and the host identifier for system stages
//! - Stage descriptors and parameter schemas
//! - Opaque items carried through a run

mod category;
mod descriptor;
mod item;

pub use category::{StageCategory, SYSTEM_HOST};
pub use descriptor::{ParameterKind, ParameterSpec, StageDescriptor};
pub use item::Item;
