use fixed_pool::prelude::*;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
#[error("invalid value: {0}")]
struct ValueError(u64);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pool<T: Send + 'static>(threads: usize) -> FixedThreadPool<T> {
    init_tracing();
    let config = Config::builder()
        .num_threads(threads)
        .timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    FixedThreadPool::new(config).unwrap()
}

#[test]
fn test_every_task_accounted_for() {
    let pool = pool::<u64>(4);
    let n = 50u64;

    for id in 0..n {
        pool.submit(move || {
            if id % 7 == 3 {
                Err(ValueError(id))
            } else {
                Ok(id)
            }
        })
        .unwrap();
    }
    pool.drain();

    let returns = pool.returns();
    let exceptions = pool.exceptions();
    assert_eq!(returns.len() + exceptions.len(), n as usize);
    assert_eq!(pool.task_count(), n);

    let mut seen = BTreeSet::new();
    for value in &returns {
        assert!(seen.insert(*value));
    }
    for err in &exceptions {
        assert!(seen.insert(err.id().as_u64()));
        assert_eq!(err.downcast_ref::<ValueError>().map(|e| e.0), Some(err.id().as_u64()));
    }
    assert_eq!(seen, (0..n).collect::<BTreeSet<_>>());

    pool.close().unwrap();
}

#[test]
fn test_results_in_submission_order() {
    let pool = pool::<u64>(3);
    let finished = Arc::new(Mutex::new(Vec::new()));

    for (id, delay_ms) in [(0u64, 300u64), (1, 100), (2, 0)] {
        let finished = finished.clone();
        pool.submit(move || {
            thread::sleep(Duration::from_millis(delay_ms));
            finished.lock().push(id);
            Ok::<_, Error>(id)
        })
        .unwrap();
    }
    pool.drain();

    assert_eq!(*finished.lock(), vec![2, 1, 0]);
    assert_eq!(pool.returns(), vec![0, 1, 2]);
    assert!(pool.exceptions().is_empty());
}

#[test]
fn test_failing_task_is_isolated() {
    let pool = pool::<u64>(2);

    for id in 0..5u64 {
        pool.submit(move || if id == 2 { Err(ValueError(id)) } else { Ok(id * 10) })
            .unwrap();
    }
    pool.drain();

    assert_eq!(pool.returns(), vec![0, 10, 30, 40]);
    let exceptions = pool.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].id(), TaskId::new(2));
    assert!(exceptions[0].downcast_ref::<ValueError>().is_some());

    assert!(pool.is_alive());
    assert_eq!(pool.worker_count(), 2);

    // still usable
    pool.submit(|| Ok::<_, ValueError>(99)).unwrap();
    pool.drain();
    assert_eq!(pool.returns().last(), Some(&99));
}

#[test]
fn test_panicking_task_is_isolated() {
    let pool = pool::<u32>(1);

    pool.submit(|| -> std::result::Result<u32, ValueError> { panic!("task blew up") })
        .unwrap();
    pool.submit(|| Ok::<_, ValueError>(7)).unwrap();
    pool.drain();

    assert_eq!(pool.returns(), vec![7]);
    let exceptions = pool.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert!(exceptions[0].is_panic());
    assert!(matches!(
        exceptions[0].kind(),
        TaskErrorKind::Panicked { message } if message == "task blew up"
    ));
    assert!(pool.is_alive());
}

#[test]
fn test_raise_first_uses_lowest_id() {
    let pool = pool::<()>(2);

    pool.submit(|| {
        thread::sleep(Duration::from_millis(200));
        Err(ValueError(0))
    })
    .unwrap();
    pool.submit(|| Err(ValueError(1))).unwrap();
    pool.drain();

    let err = pool.raise_first().unwrap_err();
    let task_err = err.as_task_error().unwrap();
    assert_eq!(task_err.id(), TaskId::new(0));
    assert_eq!(task_err.downcast_ref::<ValueError>().map(|e| e.0), Some(0));

    // the other failure is still inspectable
    assert_eq!(pool.exceptions().len(), 2);
}

#[test]
fn test_raise_first_ok_without_failures() {
    let pool = pool::<u8>(2);
    pool.submit(|| Ok::<_, ValueError>(1)).unwrap();
    pool.drain();
    assert!(pool.raise_first().is_ok());
}

#[test]
fn test_close_leaves_no_workers() {
    let pool = pool::<u64>(3);
    for id in 0..10u64 {
        pool.submit(move || {
            thread::sleep(Duration::from_millis(5));
            Ok::<_, ValueError>(id)
        })
        .unwrap();
    }

    pool.close().unwrap();

    assert!(!pool.is_alive());
    assert_eq!(pool.worker_count(), 0);
    assert!(pool.is_closed());
    assert_eq!(pool.returns().len(), 10);
    assert!(matches!(
        pool.submit(|| Ok::<_, ValueError>(0)),
        Err(Error::Closed)
    ));

    // second close is a no-op
    pool.close().unwrap();
}

#[test]
fn test_stop_within_one_timeout() {
    init_tracing();
    let timeout = Duration::from_millis(50);
    let config = Config::builder()
        .num_threads(4)
        .timeout(timeout)
        .build()
        .unwrap();
    let pool: FixedThreadPool<()> = FixedThreadPool::new(config).unwrap();

    // let every worker settle into an idle wait
    thread::sleep(Duration::from_millis(30));

    let start = Instant::now();
    pool.stop().unwrap();
    let elapsed = start.elapsed();

    assert!(!pool.is_alive());
    assert!(elapsed < timeout * 2, "stop took {:?}", elapsed);
    assert!(matches!(
        pool.submit(|| Ok::<_, ValueError>(())),
        Err(Error::Closed)
    ));
}

#[test]
fn test_stop_cancels_queued_tasks() {
    let pool = pool::<u64>(1);

    pool.submit(|| {
        thread::sleep(Duration::from_millis(100));
        Ok::<_, ValueError>(0)
    })
    .unwrap();
    // give the worker time to pick up the first task
    thread::sleep(Duration::from_millis(20));
    for id in 1..6u64 {
        pool.submit(move || Ok::<_, ValueError>(id)).unwrap();
    }

    pool.stop().unwrap();

    assert_eq!(pool.returns(), vec![0]);
    let exceptions = pool.exceptions();
    assert_eq!(exceptions.len(), 5);
    assert!(exceptions.iter().all(|e| e.is_cancelled()));
    assert_eq!(pool.pending(), 0);

    // close after stop returns immediately
    pool.close().unwrap();
}

#[test]
fn test_terminate_leaves_no_workers() {
    let pool = pool::<u64>(2);

    for id in 0..20u64 {
        pool.submit(move || {
            thread::sleep(Duration::from_millis(10));
            Ok::<_, ValueError>(id)
        })
        .unwrap();
    }

    pool.terminate().unwrap();

    assert!(!pool.is_alive());
    assert_eq!(pool.worker_count(), 0);
    assert_eq!(pool.pending(), 0);

    let done = pool.returns().len();
    let exceptions = pool.exceptions();
    assert_eq!(done + exceptions.len(), 20);
    assert!(done < 20, "terminate ran the whole queue");
    assert!(!exceptions.is_empty());
    assert!(exceptions.iter().all(|e| e.is_cancelled()));
    assert!(matches!(
        pool.submit(|| Ok::<_, ValueError>(0)),
        Err(Error::Closed)
    ));
}

#[test]
fn test_concurrent_close_waits_for_workers() {
    let pool = pool::<u64>(2);
    for id in 0..4u64 {
        pool.submit(move || {
            thread::sleep(Duration::from_millis(50));
            Ok::<_, ValueError>(id)
        })
        .unwrap();
    }

    thread::scope(|s| {
        let closers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    pool.close().unwrap();
                    assert!(!pool.is_alive());
                })
            })
            .collect();
        for closer in closers {
            closer.join().unwrap();
        }
    });

    assert_eq!(pool.returns(), vec![0, 1, 2, 3]);
}

#[test]
fn test_drain_twice_is_noop() {
    let pool = pool::<u64>(2);
    for id in 0..5u64 {
        pool.submit(move || if id == 4 { Err(ValueError(id)) } else { Ok(id) })
            .unwrap();
    }

    pool.drain();
    let returns = pool.returns();
    let failures = pool.exceptions().len();

    let start = Instant::now();
    pool.drain();
    pool.drain();
    assert!(start.elapsed() < Duration::from_millis(20));

    assert_eq!(pool.returns(), returns);
    assert_eq!(pool.exceptions().len(), failures);
}

#[test]
fn test_drain_timeout() {
    let pool = pool::<()>(1);
    pool.submit(|| {
        thread::sleep(Duration::from_millis(200));
        Ok::<_, ValueError>(())
    })
    .unwrap();

    assert!(!pool.drain_timeout(Duration::from_millis(10)));
    assert!(pool.drain_timeout(Duration::from_secs(5)));
}

#[test]
fn test_tasks_run_concurrently() {
    let pool = pool::<()>(2);
    let barrier = Arc::new(Barrier::new(2));

    for _ in 0..2 {
        let barrier = barrier.clone();
        pool.submit(move || {
            barrier.wait();
            Ok::<_, ValueError>(())
        })
        .unwrap();
    }

    assert!(pool.drain_timeout(Duration::from_secs(5)), "tasks were serialized");
    assert_eq!(pool.returns().len(), 2);
}

#[test]
fn test_concurrent_submitters_get_unique_ids() {
    let pool = pool::<u64>(4);

    thread::scope(|s| {
        for t in 0..4u64 {
            let pool = &pool;
            s.spawn(move || {
                for i in 0..25u64 {
                    pool.submit(move || Ok::<_, ValueError>(t * 100 + i)).unwrap();
                }
            });
        }
    });
    pool.drain();

    let mut values = pool.returns();
    assert_eq!(values.len(), 100);
    values.sort_unstable();
    values.dedup();
    assert_eq!(values.len(), 100);
    assert_eq!(pool.task_count(), 100);
}

#[test]
fn test_bounded_queue_reports_full() {
    init_tracing();
    let config = Config::builder()
        .num_threads(1)
        .queue_capacity(1)
        .timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let pool: FixedThreadPool<u8> = FixedThreadPool::new(config).unwrap();
    let gate = Arc::new(Barrier::new(2));

    {
        let gate = gate.clone();
        pool.submit(move || {
            gate.wait();
            Ok::<_, ValueError>(1)
        })
        .unwrap();
    }
    // the worker now holds the first task
    thread::sleep(Duration::from_millis(50));
    pool.submit(|| Ok::<_, ValueError>(2)).unwrap();

    let err = pool.submit(|| Ok::<_, ValueError>(3)).unwrap_err();
    assert!(matches!(err, Error::QueueFull { .. }));

    gate.wait();
    pool.drain();
    assert_eq!(pool.returns(), vec![1, 2]);
    assert_eq!(pool.task_count(), 2);
}

#[test]
fn test_print_exceptions_does_not_disturb_results() {
    init_tracing();
    let config = Config::builder()
        .num_threads(3)
        .timeout(Duration::from_millis(20))
        .print_exceptions(true)
        .build()
        .unwrap();
    let pool: FixedThreadPool<u64> = FixedThreadPool::new(config).unwrap();

    for id in 0..12u64 {
        pool.submit(move || if id % 2 == 0 { Err(ValueError(id)) } else { Ok(id) })
            .unwrap();
    }
    pool.drain();

    assert_eq!(pool.returns(), vec![1, 3, 5, 7, 9, 11]);
    let ids: Vec<u64> = pool.exceptions().iter().map(|e| e.id().as_u64()).collect();
    assert_eq!(ids, vec![0, 2, 4, 6, 8, 10]);
}

#[test]
fn test_drop_closes_pool() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = pool::<()>(2);
        for _ in 0..8 {
            let counter = counter.clone();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ValueError>(())
            })
            .unwrap();
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 8);
}

#[test]
fn test_scope_closes_on_panic() {
    init_tracing();
    let counter = Arc::new(AtomicUsize::new(0));
    let config = Config::builder()
        .num_threads(2)
        .timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        scope(config, |pool: &FixedThreadPool<()>| {
            let counter = counter.clone();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(50));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ValueError>(())
            })
            .unwrap();
            panic!("caller failed");
        })
    }));

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scope_returns_caller_error() {
    init_tracing();
    let config = Config::builder().num_threads(2).build().unwrap();
    let outcome = scope(
        config,
        |pool: &FixedThreadPool<u64>| -> fixed_pool::Result<Vec<u64>> {
            for id in 0..4u64 {
                pool.submit(move || if id == 1 { Err(ValueError(id)) } else { Ok(id) })?;
            }
            pool.drain();
            pool.raise_first()?;
            Ok(pool.returns())
        },
    );

    let inner = outcome.unwrap();
    let err = inner.unwrap_err();
    assert_eq!(err.as_task_error().map(|e| e.id()), Some(TaskId::new(1)));
}

#[cfg(feature = "telemetry")]
#[test]
fn test_metrics_track_outcomes() {
    let pool = pool::<u64>(2);
    for id in 0..10u64 {
        pool.submit(move || match id {
            3 => Err(ValueError(id)),
            5 => panic!("boom"),
            _ => Ok(id),
        })
        .unwrap();
    }
    pool.drain();

    let snapshot = pool.metrics();
    assert_eq!(snapshot.tasks_submitted, 10);
    assert_eq!(snapshot.tasks_executed, 10);
    assert_eq!(snapshot.tasks_failed, 1);
    assert_eq!(snapshot.tasks_panicked, 1);
    assert_eq!(snapshot.tasks_succeeded(), 8);
}
