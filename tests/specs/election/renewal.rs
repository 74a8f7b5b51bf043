//! Renewal that arrives after the lease has lapsed

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn late_renewal_stops_task_and_reacquires() {
    let lock = FakeLock::new(LEASE);
    let record = RecordingTask::new();

    // Renewing every 15ms against a 10ms lease always comes too late
    let timing = TimingPolicy::new(ms(15), ms(11), Duration::ZERO);
    let a = launch(lock.clone(), "a", timing, &record);

    sleep(ms(5)).await;
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert!(lock.is_locked());
    assert_eq!(lock.renew_count(), 0);
    assert_eq!(record.starts(), 1);
    assert_eq!(record.live(), 1);

    // t=20: the renewal at 15 found the lease expired
    sleep(ms(15)).await;
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert!(!lock.is_locked());
    assert_eq!(record.live(), 0);
    assert_eq!(record.runner(), None);
    assert_eq!(a.state(), ControllerState::Waiting);

    // t=30: retried at 15 + 11 = 26 and leads again
    sleep(ms(10)).await;
    assert_eq!(lock.acquire_calls(&a.id), 2);
    assert!(lock.is_locked());
    assert_eq!(record.starts(), 2);
    assert_eq!(record.runner(), Some(a.id.clone()));
    assert!(a.is_leading());

    a.stop().await;
    sleep(ms(1)).await;
    assert_eq!(record.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn timely_renewals_keep_one_episode() {
    let lock = FakeLock::new(LEASE);
    let record = RecordingTask::new();
    let a = launch(lock.clone(), "a", policy(Duration::ZERO), &record);

    sleep(ms(100)).await;
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert_eq!(lock.renew_count(), 14);
    assert_eq!(record.starts(), 1);
    assert!(a.is_leading());

    a.stop().await;
}

#[tokio::test(start_paused = true)]
async fn standby_takes_over_after_renewal_failure() {
    let lock = FakeLock::new(LEASE);
    let record = RecordingTask::new();
    let a = launch(lock.clone(), "a", policy(ms(0)), &record);
    let b = launch(lock.clone(), "b", policy(ms(3)), &record);

    // a's renewal at 7 fails; the backend also drops the lease
    sleep(ms(5)).await;
    lock.fail_next_renews(1);
    lock.force_release();

    // b retries at 3, 14; a retries at 7 + 0 + 11 = 18
    sleep(ms(10)).await;
    assert!(b.is_leading());
    assert!(!a.is_leading());
    assert_eq!(lock.holder(), Some(b.id.clone()));
    assert_eq!(record.runner(), Some(b.id.clone()));
    assert_eq!(record.starts(), 2);
    assert_eq!(record.max_live(), 1);

    sleep(ms(5)).await;
    assert_eq!(lock.acquire_calls(&a.id), 2);
    assert!(b.is_leading());

    a.stop().await;
    b.stop().await;
}
