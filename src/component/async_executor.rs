//! Per-component worker for asynchronous read/write cycles.
//!
//! One dedicated thread per async component runs `read` then, when the
//! read succeeded, `write`. The realtime caller only ever interacts with
//! a depth-one trigger slot and atomically published results, so it never
//! blocks on the worker: a trigger that arrives while the previous cycle
//! is still running is rejected.
//!
//! Cancellation is cooperative. `stop` raises a flag and wakes the worker;
//! an in-flight cycle completes before the thread exits.

use crate::component::io::ComponentIo;
use crate::component::Driver;
use crate::types::CycleResult;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of a trigger call.
#[derive(Debug, Clone, Copy)]
pub struct TriggerStatus {
    /// False when the previous cycle was still running (async only).
    pub accepted: bool,
    /// Most recently published return of the triggered direction.
    pub result: CycleResult,
    /// Most recently published execution time, `None` before the first cycle.
    pub execution_time: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct CyclePayload {
    time: Duration,
    period: Duration,
}

struct AsyncShared {
    pending: Mutex<Option<CyclePayload>>,
    wake: Condvar,
    stop: AtomicBool,
    busy: AtomicBool,
    read_result: AtomicU8,
    write_result: AtomicU8,
    /// Nanoseconds; 0 = not yet published.
    read_execution_ns: AtomicU64,
    write_execution_ns: AtomicU64,
}

/// Worker handle owned by one hardware component.
pub(crate) struct AsyncExecutor {
    shared: Arc<AsyncShared>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncExecutor {
    /// Spawn the worker at best-effort `thread_priority`.
    pub(crate) fn start(
        component: &str,
        thread_priority: i32,
        driver: Arc<Mutex<Driver>>,
        io: Arc<ComponentIo>,
    ) -> Self {
        let shared = Arc::new(AsyncShared {
            pending: Mutex::new(None),
            wake: Condvar::new(),
            stop: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            read_result: AtomicU8::new(CycleResult::Ok.to_u8()),
            write_result: AtomicU8::new(CycleResult::Ok.to_u8()),
            read_execution_ns: AtomicU64::new(0),
            write_execution_ns: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let name = component.to_string();
        let worker = std::thread::Builder::new()
            .name(format!("{component}-io"))
            .spawn(move || {
                if let Err(reason) = apply_thread_priority(thread_priority) {
                    warn!(
                        "async worker for '{}' runs without realtime priority: {}",
                        name, reason
                    );
                }
                worker_loop(&name, &worker_shared, &driver, &io);
            })
            .expect("failed to spawn async worker thread");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Submit one `(time, period)` cycle without blocking.
    ///
    /// Returns the most recently published read return. A rejected trigger
    /// reports `Ok` so a busy worker is not mistaken for a failing one.
    pub(crate) fn trigger_cycle(&self, time: Duration, period: Duration) -> TriggerStatus {
        let result = CycleResult::from_u8(self.shared.read_result.load(Ordering::Acquire));
        let execution_time = load_execution(&self.shared.read_execution_ns);

        let mut slot = self.shared.pending.lock();
        if self.shared.busy.load(Ordering::Acquire) || slot.is_some() {
            return TriggerStatus {
                accepted: false,
                result: CycleResult::Ok,
                execution_time,
            };
        }
        self.shared.busy.store(true, Ordering::Release);
        *slot = Some(CyclePayload { time, period });
        drop(slot);
        self.shared.wake.notify_one();

        TriggerStatus {
            accepted: true,
            result,
            execution_time,
        }
    }

    /// Most recently published write return; never triggers anything.
    pub(crate) fn write_status(&self) -> TriggerStatus {
        TriggerStatus {
            accepted: true,
            result: CycleResult::from_u8(self.shared.write_result.load(Ordering::Acquire)),
            execution_time: load_execution(&self.shared.write_execution_ns),
        }
    }

    /// Reset published results before activation so stale errors from a
    /// previous active phase do not immediately re-fail the component.
    pub(crate) fn reset_published(&self) {
        self.shared
            .read_result
            .store(CycleResult::Ok.to_u8(), Ordering::Release);
        self.shared
            .write_result
            .store(CycleResult::Ok.to_u8(), Ordering::Release);
        self.shared.read_execution_ns.store(0, Ordering::Release);
        self.shared.write_execution_ns.store(0, Ordering::Release);
    }

    /// Cooperatively stop and join the worker.
    pub(crate) fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        // Synchronize on the trigger mutex so the flag store cannot slip
        // into the window between the worker's stop check and its wait.
        drop(self.shared.pending.lock());
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AsyncExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncExecutor")
            .field("busy", &self.shared.busy.load(Ordering::Relaxed))
            .finish()
    }
}

fn worker_loop(
    component: &str,
    shared: &AsyncShared,
    driver: &Mutex<Driver>,
    io: &ComponentIo,
) {
    debug!("async worker for '{}' started", component);
    loop {
        let payload = {
            let mut slot = shared.pending.lock();
            loop {
                if shared.stop.load(Ordering::Acquire) {
                    debug!("async worker for '{}' stopping", component);
                    return;
                }
                if let Some(payload) = slot.take() {
                    break payload;
                }
                shared.wake.wait(&mut slot);
            }
        };

        let read_start = Instant::now();
        let read_result = driver.lock().read(payload.time, payload.period, io);
        store_execution(&shared.read_execution_ns, read_start.elapsed());
        shared
            .read_result
            .store(read_result.to_u8(), Ordering::Release);

        // Within one cycle the read strictly precedes the write, and a
        // failed read suppresses it.
        if read_result == CycleResult::Ok {
            let write_start = Instant::now();
            let write_result = driver.lock().write(payload.time, payload.period, io);
            store_execution(&shared.write_execution_ns, write_start.elapsed());
            shared
                .write_result
                .store(write_result.to_u8(), Ordering::Release);
        }

        shared.busy.store(false, Ordering::Release);
    }
}

fn store_execution(slot: &AtomicU64, elapsed: Duration) {
    let nanos = (elapsed.as_nanos() as u64).max(1);
    slot.store(nanos, Ordering::Release);
}

fn load_execution(slot: &AtomicU64) -> Option<Duration> {
    match slot.load(Ordering::Acquire) {
        0 => None,
        nanos => Some(Duration::from_nanos(nanos)),
    }
}

/// Best-effort SCHED_FIFO for the calling thread. Priority application is
/// platform-specific and a no-op where unsupported.
#[cfg(target_os = "linux")]
fn apply_thread_priority(priority: i32) -> Result<(), String> {
    let priority = priority.clamp(1, 99);
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe {
        libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param)
    };
    if ret != 0 {
        Err(std::io::Error::from_raw_os_error(ret).to_string())
    } else {
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_thread_priority(_priority: i32) -> Result<(), String> {
    Err("realtime scheduling not supported on this platform".to_string())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::HardwareDriver;

    struct SlowDriver {
        delay: Duration,
        result: CycleResult,
    }

    impl HardwareDriver for SlowDriver {
        fn read(&mut self, _time: Duration, _period: Duration, _io: &ComponentIo) -> CycleResult {
            std::thread::sleep(self.delay);
            self.result
        }
    }

    fn executor(delay: Duration, result: CycleResult) -> AsyncExecutor {
        let driver = Arc::new(Mutex::new(Driver::System(Box::new(SlowDriver {
            delay,
            result,
        }))));
        let io = Arc::new(ComponentIo::empty());
        AsyncExecutor::start("test", 50, driver, io)
    }

    fn wait_idle(exec: &AsyncExecutor) {
        while exec.shared.busy.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn trigger_runs_a_cycle_and_publishes_results() {
        let mut exec = executor(Duration::from_millis(1), CycleResult::Ok);
        let status = exec.trigger_cycle(Duration::ZERO, Duration::from_millis(10));
        assert!(status.accepted);
        // Nothing published yet before the first cycle completes.
        assert_eq!(status.execution_time, None);

        wait_idle(&exec);
        let status = exec.trigger_cycle(Duration::from_millis(10), Duration::from_millis(10));
        assert!(status.accepted);
        assert_eq!(status.result, CycleResult::Ok);
        assert!(status.execution_time.unwrap() >= Duration::from_millis(1));
        wait_idle(&exec);
        assert_eq!(exec.write_status().result, CycleResult::Ok);
        exec.stop();
    }

    #[test]
    fn busy_worker_rejects_triggers() {
        let mut exec = executor(Duration::from_millis(100), CycleResult::Ok);
        assert!(
            exec.trigger_cycle(Duration::ZERO, Duration::from_millis(10))
                .accepted
        );
        // Give the worker time to pick the payload up, then hammer it.
        std::thread::sleep(Duration::from_millis(10));
        let rejected = exec.trigger_cycle(Duration::ZERO, Duration::from_millis(10));
        assert!(!rejected.accepted);
        assert_eq!(rejected.result, CycleResult::Ok);
        exec.stop();
    }

    #[test]
    fn failed_read_is_published_on_next_trigger() {
        let mut exec = executor(Duration::from_millis(1), CycleResult::Error);
        exec.trigger_cycle(Duration::ZERO, Duration::from_millis(10));
        wait_idle(&exec);
        let status = exec.trigger_cycle(Duration::ZERO, Duration::from_millis(10));
        assert!(status.accepted);
        assert_eq!(status.result, CycleResult::Error);
        exec.stop();
    }

    #[test]
    fn stop_joins_the_worker() {
        let mut exec = executor(Duration::from_millis(1), CycleResult::Ok);
        exec.trigger_cycle(Duration::ZERO, Duration::from_millis(10));
        exec.stop();
        assert!(exec.worker.is_none());
    }
}
