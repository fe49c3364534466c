//! Process monitor implementation.

use parking_lot::{Condvar, Mutex};
use std::ffi::{OsStr, OsString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

type StartCallback = Box<dyn FnOnce() + Send>;
type TickCallback = Box<dyn FnMut(Duration) + Send>;
type FinishCallback = Box<dyn FnOnce(MonitorOutcome) + Send>;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// How a monitored process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    /// Time from start until the process was seen to exit.
    pub elapsed: Duration,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// The monitor was stopped before the process exited on its own.
    pub stopped: bool,
}

impl MonitorOutcome {
    /// Returns true if the process exited on its own with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.stopped && self.exit_code == Some(0)
    }
}

/// A finished process, as delivered by [`ProcessMonitor::forward_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorMessage {
    /// The monitored program.
    pub program: String,
    /// How it ended.
    pub outcome: MonitorOutcome,
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Waits up to `timeout`; returns true once stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.wake.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

/// Builder for a monitored process.
pub struct ProcessMonitor {
    program: OsString,
    args: Vec<OsString>,
    interval: Duration,
    on_start: Option<StartCallback>,
    on_tick: Option<TickCallback>,
    on_finish: Option<FinishCallback>,
}

impl ProcessMonitor {
    /// Creates a monitor for `program`, polling every 500ms.
    #[must_use]
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            interval: DEFAULT_INTERVAL,
            on_start: None,
            on_tick: None,
            on_finish: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Called once, on the monitor thread, after the process started.
    #[must_use]
    pub fn on_start(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    /// Called after each interval while the process is still running.
    #[must_use]
    pub fn on_tick(mut self, callback: impl FnMut(Duration) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Called exactly once when the process exits or the monitor is stopped.
    #[must_use]
    pub fn on_finish(mut self, callback: impl FnOnce(MonitorOutcome) + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(callback));
        self
    }

    /// Also sends a [`MonitorMessage`] to `sender` on finish.
    ///
    /// Any finish callback set before this call still runs first.
    #[must_use]
    pub fn forward_to(mut self, sender: UnboundedSender<MonitorMessage>) -> Self {
        let program = self.program.to_string_lossy().into_owned();
        let previous = self.on_finish.take();
        self.on_finish(move |outcome| {
            if let Some(previous) = previous {
                previous(outcome.clone());
            }
            if sender.send(MonitorMessage { program, outcome }).is_err() {
                debug!("Monitor message receiver dropped");
            }
        })
    }

    /// Spawns the process and its watcher thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or the thread
    /// cannot be created.
    pub fn start(self) -> std::io::Result<MonitorHandle> {
        let Self {
            program,
            args,
            interval,
            on_start,
            on_tick,
            on_finish,
        } = self;

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .spawn()?;
        let pid = child.id();
        let label = program.to_string_lossy().into_owned();
        info!(program = %label, pid, "Process started");

        let signal = Arc::new(StopSignal::default());
        let watcher = Watcher {
            child,
            label: label.clone(),
            interval,
            signal: signal.clone(),
            on_start,
            on_tick,
            on_finish,
        };
        let thread = thread::Builder::new()
            .name(format!("monitor-{pid}"))
            .spawn(move || watcher.run())?;

        Ok(MonitorHandle {
            signal,
            thread: Some(thread),
            pid,
            program: label,
        })
    }
}

impl std::fmt::Debug for ProcessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMonitor")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

struct Watcher {
    child: Child,
    label: String,
    interval: Duration,
    signal: Arc<StopSignal>,
    on_start: Option<StartCallback>,
    on_tick: Option<TickCallback>,
    on_finish: Option<FinishCallback>,
}

impl Watcher {
    fn run(mut self) {
        let started = Instant::now();
        if let Some(on_start) = self.on_start.take() {
            guarded(&self.label, "start", on_start);
        }

        let (exit_code, stopped) = loop {
            if self.signal.wait(self.interval) {
                break self.kill();
            }
            match self.child.try_wait() {
                Ok(Some(status)) => break (status.code(), false),
                Ok(None) => {
                    if let Some(on_tick) = self.on_tick.as_mut() {
                        let elapsed = started.elapsed();
                        guarded(&self.label, "tick", || on_tick(elapsed));
                    }
                }
                Err(e) => {
                    warn!(program = %self.label, error = %e, "Polling process failed");
                    break (None, false);
                }
            }
        };

        let outcome = MonitorOutcome {
            elapsed: started.elapsed(),
            exit_code,
            stopped,
        };
        info!(
            program = %self.label,
            exit_code = ?outcome.exit_code,
            stopped,
            elapsed_ms = outcome.elapsed.as_secs_f64() * 1000.0,
            "Process finished"
        );
        if let Some(on_finish) = self.on_finish.take() {
            guarded(&self.label, "finish", move || on_finish(outcome));
        }
    }

    fn kill(&mut self) -> (Option<i32>, bool) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!(program = %self.label, error = %e, "Killing process failed");
            }
        }
        let exit_code = self.child.wait().ok().and_then(|status| status.code());
        (exit_code, true)
    }
}

/// Runs a callback, logging instead of unwinding the monitor thread.
fn guarded(label: &str, callback: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(program = %label, callback, "Monitor callback panicked");
    }
}

/// Controls a running monitor. Dropping the handle stops the monitor.
pub struct MonitorHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
    pid: u32,
    program: String,
}

impl MonitorHandle {
    /// Returns the process id.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns true once the watcher thread has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops monitoring, killing the process if it is still running, and
    /// waits for the finish callback.
    pub fn stop(mut self) {
        self.signal.stop();
        self.join();
    }

    /// Waits for the process to exit on its own.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(program = %self.program, "Monitor thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.signal.stop();
            self.join();
        }
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counts {
        start: AtomicUsize,
        tick: AtomicUsize,
        finish: AtomicUsize,
        outcome: Mutex<Option<MonitorOutcome>>,
    }

    fn counted(monitor: ProcessMonitor, counts: &Arc<Counts>) -> ProcessMonitor {
        let (s, t, f) = (counts.clone(), counts.clone(), counts.clone());
        monitor
            .on_start(move || {
                s.start.fetch_add(1, Ordering::SeqCst);
            })
            .on_tick(move |_| {
                t.tick.fetch_add(1, Ordering::SeqCst);
            })
            .on_finish(move |outcome| {
                f.finish.fetch_add(1, Ordering::SeqCst);
                *f.outcome.lock() = Some(outcome);
            })
    }

    #[test]
    fn test_short_process_callbacks() {
        let counts = Arc::new(Counts::default());
        let handle = counted(
            ProcessMonitor::new("true").interval(Duration::from_millis(200)),
            &counts,
        )
        .start()
        .unwrap();
        handle.wait();

        assert_eq!(counts.start.load(Ordering::SeqCst), 1);
        assert!(counts.tick.load(Ordering::SeqCst) <= 1);
        assert_eq!(counts.finish.load(Ordering::SeqCst), 1);
        let outcome = counts.outcome.lock().clone().unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.success());
    }

    #[test]
    fn test_exit_code_reported() {
        let counts = Arc::new(Counts::default());
        counted(
            ProcessMonitor::new("sh")
                .args(["-c", "exit 3"])
                .interval(Duration::from_millis(20)),
            &counts,
        )
        .start()
        .unwrap()
        .wait();

        let outcome = counts.outcome.lock().clone().unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.stopped);
        assert!(!outcome.success());
    }

    #[test]
    fn test_ticks_while_running() {
        let counts = Arc::new(Counts::default());
        counted(
            ProcessMonitor::new("sleep")
                .args(["0.5"])
                .interval(Duration::from_millis(20)),
            &counts,
        )
        .start()
        .unwrap()
        .wait();

        assert!(counts.tick.load(Ordering::SeqCst) >= 1);
        assert_eq!(counts.finish.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_kills_process() {
        let counts = Arc::new(Counts::default());
        let handle = counted(
            ProcessMonitor::new("sleep")
                .args(["30"])
                .interval(Duration::from_secs(10)),
            &counts,
        )
        .start()
        .unwrap();
        assert!(handle.pid() > 0);
        handle.stop();

        assert_eq!(counts.finish.load(Ordering::SeqCst), 1);
        let outcome = counts.outcome.lock().clone().unwrap();
        assert!(outcome.stopped);
        assert!(outcome.elapsed < Duration::from_secs(10));
    }

    #[test]
    fn test_drop_stops_monitor() {
        let counts = Arc::new(Counts::default());
        let handle = counted(ProcessMonitor::new("sleep").args(["30"]), &counts)
            .start()
            .unwrap();
        drop(handle);

        assert_eq!(counts.finish.load(Ordering::SeqCst), 1);
        assert!(counts.outcome.lock().as_ref().unwrap().stopped);
    }

    #[test]
    fn test_spawn_error_returned() {
        assert!(ProcessMonitor::new("definitely-not-a-real-program-xyz")
            .start()
            .is_err());
    }

    #[test]
    fn test_panicking_callback_still_finishes() {
        let counts = Arc::new(Counts::default());
        let f = counts.clone();
        ProcessMonitor::new("true")
            .interval(Duration::from_millis(20))
            .on_start(|| panic!("start callback"))
            .on_finish(move |_| {
                f.finish.fetch_add(1, Ordering::SeqCst);
            })
            .start()
            .unwrap()
            .wait();

        assert_eq!(counts.finish.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forward_to_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let counts = Arc::new(Counts::default());
        counted(
            ProcessMonitor::new("true").interval(Duration::from_millis(20)),
            &counts,
        )
        .forward_to(tx)
        .start()
        .unwrap()
        .wait();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.program, "true");
        assert_eq!(message.outcome.exit_code, Some(0));
        assert_eq!(counts.finish.load(Ordering::SeqCst), 1);
    }
}
