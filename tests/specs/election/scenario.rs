//! Two, then three, controllers sharing one lock
//!
//! a starts immediately and always wins the first race; b starts 6ms later
//! and keeps retrying every 11ms; c joins at t=30 with a 1ms delay.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn instances_take_turns_on_one_lock() {
    let lock = FakeLock::new(LEASE);
    let record = RecordingTask::new();
    assert!(!lock.is_locked());

    let a = launch(lock.clone(), "a", policy(ms(0)), &record);
    let b = launch(lock.clone(), "b", policy(ms(6)), &record);

    // t=4: a holds the lock and runs the task; b has not tried yet; no
    // renewal is due
    sleep(ms(4)).await;
    assert!(lock.is_locked());
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 0);
    assert_eq!(lock.renew_count(), 0);
    assert_eq!(record.starts(), 1);
    assert_eq!(record.runner(), Some(a.id.clone()));
    assert!(a.is_leading());

    // t=10: b failed once (t=6); a renewed once (t=7)
    sleep(ms(6)).await;
    assert!(lock.is_locked());
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 1);
    assert_eq!(lock.renew_count(), 1);
    assert_eq!(record.starts(), 1);
    assert_eq!(record.runner(), Some(a.id.clone()));
    assert_eq!(b.state(), ControllerState::Waiting);

    // t=15: b's next attempt is at 6 + 11 = 17; a renewed at 14
    sleep(ms(5)).await;
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 1);
    assert!(lock.is_locked());
    assert_eq!(lock.renew_count(), 2);
    assert_eq!(record.starts(), 1);

    // t=30: b tried at 6, 17, 28; a renewed at 7, 14, 21, 28
    sleep(ms(15)).await;
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 3);
    assert!(lock.is_locked());
    assert_eq!(lock.renew_count(), 4);
    assert_eq!(record.starts(), 1);
    assert_eq!(record.runner(), Some(a.id.clone()));

    let c = launch(lock.clone(), "c", policy(ms(1)), &record);

    // t=45: c tried at 31 and 42; b at 39; a renewed at 35 and 42
    sleep(ms(15)).await;
    assert_eq!(lock.acquire_calls(&a.id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 4);
    assert_eq!(lock.acquire_calls(&c.id), 2);
    assert!(lock.is_locked());
    assert_eq!(lock.renew_count(), 6);
    assert_eq!(record.starts(), 1);
    assert_eq!(record.runner(), Some(a.id.clone()));

    // Stop a and drop its lease from outside
    let a_id = a.id.clone();
    a.stop().await;
    lock.force_release();

    // t=55: b's fifth attempt (t=50) wins; c tried again at 53 and lost
    sleep(ms(10)).await;
    assert_eq!(lock.acquire_calls(&a_id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 5);
    assert_eq!(lock.acquire_calls(&c.id), 3);
    assert!(lock.is_locked());
    assert_eq!(lock.renew_count(), 0);
    assert_eq!(record.starts(), 2);
    assert_eq!(record.runner(), Some(b.id.clone()));
    assert!(b.is_leading());
    assert!(!c.is_leading());

    // t=60: b renewed once (t=57); c's next attempt is at 64
    sleep(ms(5)).await;
    assert_eq!(lock.acquire_calls(&a_id), 1);
    assert_eq!(lock.acquire_calls(&b.id), 5);
    assert_eq!(lock.acquire_calls(&c.id), 3);
    assert!(lock.is_locked());
    assert_eq!(lock.renew_count(), 1);
    assert_eq!(record.starts(), 2);
    assert_eq!(record.runner(), Some(b.id.clone()));
    assert_eq!(record.max_live(), 1);

    b.stop().await;
    c.stop().await;
}
