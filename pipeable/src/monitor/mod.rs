//! Background monitoring of external processes.
//!
//! A [`ProcessMonitor`] spawns a program and watches it from one dedicated
//! thread, reporting start, periodic ticks and the final exit through
//! callbacks. Stopping is cooperative: [`MonitorHandle::stop`] wakes the
//! watcher, which kills the child if it is still running.

mod process;

pub use process::{MonitorHandle, MonitorMessage, MonitorOutcome, ProcessMonitor};
