//! Failover over the in-process lease backend

use crate::prelude::*;

fn table() -> LeaseTable {
    LeaseTable::new(LeaseConfig::new("leader", LEASE))
}

#[tokio::test(start_paused = true)]
async fn standby_leads_once_abandoned_lease_expires() {
    let table = table();
    let record = RecordingTask::new();
    let a = launch(table.client(), "a", policy(ms(0)), &record);
    let b = launch(table.client(), "b", policy(ms(3)), &record);

    sleep(ms(20)).await;
    assert!(a.is_leading());
    assert_eq!(table.holder(), Some(a.id.clone()));

    // a stops without releasing; its last renewal was at 14
    a.stop().await;
    assert_eq!(table.holder(), Some(ControllerId::new("a")));

    // b's attempt at 25 finds the lease 11ms stale and reclaims it
    sleep(ms(4)).await;
    assert!(!b.is_leading());
    assert_eq!(record.live(), 0);
    sleep(ms(2)).await;
    assert!(b.is_leading());
    assert_eq!(table.holder(), Some(b.id.clone()));
    assert_eq!(record.runner(), Some(b.id.clone()));
    assert_eq!(record.starts(), 2);

    b.stop().await;
}

#[tokio::test(start_paused = true)]
async fn successor_is_bounded_by_lease_and_retry() {
    for delay in 0..10 {
        let table = table();
        let record = RecordingTask::new();
        let a = launch(table.client(), "a", policy(ms(0)), &record);
        let b = launch(table.client(), "b", policy(ms(delay + 1)), &record);

        sleep(ms(30)).await;
        assert!(a.is_leading());
        a.stop().await;

        // Expiry takes at most a lease, the next attempt at most a retry
        let bound = LEASE + policy(Duration::ZERO).wait_period;
        sleep(bound).await;
        assert!(b.is_leading(), "delay {delay}: no successor within {bound:?}");
        assert_eq!(record.max_live(), 1);

        b.stop().await;
    }
}

#[tokio::test(start_paused = true)]
async fn configured_controller_leads_through_traced_lock() {
    let config = ControllerConfig::from_toml_str(
        r#"
        lease = "10ms"
        max_jitter = "5ms"
        seed = 7
        id = "node-1"
        "#,
    )
    .unwrap();

    let table = table();
    let record = RecordingTask::new();
    let controller = LockController::new(TracedLock::new(table.client()), &config).unwrap();

    let timing = controller.timing();
    assert_eq!(timing.renewal_period, ms(7));
    assert_eq!(timing.wait_period, ms(11));
    assert!(timing.random_delay < ms(5));
    assert_eq!(controller.id(), &ControllerId::new("node-1"));

    let node = start(controller, &record);
    sleep(ms(6)).await;
    assert!(node.is_leading());
    assert_eq!(table.holder(), Some(ControllerId::new("node-1")));
    assert_eq!(record.runner(), Some(ControllerId::new("node-1")));

    node.stop().await;
    sleep(ms(1)).await;
    assert_eq!(record.live(), 0);
}
