//! Shared helpers for election specs

pub use ha_adapters::{LeaseTable, TracedLock};
pub use ha_core::{
    ControllerConfig, ControllerId, ControllerState, FakeLock, LeaseConfig, LeaseLock,
    LockController, RecordingTask, TimingPolicy,
};
pub use std::time::Duration;
pub use tokio::sync::watch;
pub use tokio::task::JoinHandle;
pub use tokio::time::sleep;
pub use tokio_util::sync::CancellationToken;

/// Lease used throughout: 7ms renewals, 11ms retries
pub const LEASE: Duration = Duration::from_millis(10);

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Default ratios applied to [`LEASE`] with a fixed startup delay
pub fn policy(random_delay: Duration) -> TimingPolicy {
    let config = ControllerConfig::new(LEASE).with_max_jitter(Duration::ZERO);
    TimingPolicy::from_config(&config)
        .unwrap()
        .with_random_delay(random_delay)
}

/// A controller running on its own task
pub struct Instance {
    pub id: ControllerId,
    pub shutdown: CancellationToken,
    pub states: watch::Receiver<ControllerState>,
    pub handle: JoinHandle<()>,
}

impl Instance {
    pub fn state(&self) -> ControllerState {
        *self.states.borrow()
    }

    pub fn is_leading(&self) -> bool {
        self.state().is_leading()
    }

    /// Cancel and wait for `run` to return
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap();
    }
}

pub fn launch<L: LeaseLock>(
    lock: L,
    name: &str,
    timing: TimingPolicy,
    record: &RecordingTask,
) -> Instance {
    let id = ControllerId::new(name);
    let controller = LockController::with_timing(lock, id.clone(), timing);
    start(controller, record)
}

pub fn start<L: LeaseLock>(controller: LockController<L>, record: &RecordingTask) -> Instance {
    let id = controller.id().clone();
    let states = controller.subscribe();
    let shutdown = CancellationToken::new();
    let task = record.for_runner(&id);
    let handle = tokio::spawn(controller.run(shutdown.clone(), task));
    Instance {
        id,
        shutdown,
        states,
        handle,
    }
}
