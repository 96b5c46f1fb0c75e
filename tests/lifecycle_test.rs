//! Integration tests for threads, groups, and scoped shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thread_lifecycle::prelude::*;

#[test]
fn test_task_thread_runs_once() {
    struct Recorder {
        result: Arc<Mutex<Vec<u32>>>,
    }

    impl Task for Recorder {
        fn run(&mut self, token: &StopToken) -> Result<()> {
            let mut result = self.result.lock().unwrap();
            result.push(0);
            if result.len() >= 4 {
                token.stop();
            }
            Ok(())
        }
    }

    let result = Arc::new(Mutex::new(Vec::new()));
    let thread = TaskThread::new(Recorder {
        result: Arc::clone(&result),
    });

    assert!(!thread.running().is_set());
    assert!(!thread.stopped().is_set());
    assert!(result.lock().unwrap().is_empty());

    {
        let _thread = thread.scoped().unwrap();
    }

    assert!(thread.stopped().is_set());
    assert_eq!(*result.lock().unwrap(), vec![0]);
}

#[test]
fn test_task_thread_looping_until_self_stop() {
    struct Recorder {
        result: Arc<Mutex<Vec<u32>>>,
    }

    impl Task for Recorder {
        fn run(&mut self, token: &StopToken) -> Result<()> {
            let mut result = self.result.lock().unwrap();
            result.push(0);
            if result.len() >= 4 {
                token.stop();
            }
            Ok(())
        }
    }

    let result = Arc::new(Mutex::new(Vec::new()));
    let thread = TaskThread::with_config(
        Recorder {
            result: Arc::clone(&result),
        },
        ThreadConfig::new("recorder").looping(true),
    );

    {
        let _thread = thread.scoped().unwrap();
    }

    assert!(thread.stopped().is_set());
    assert_eq!(*result.lock().unwrap(), vec![0, 0, 0, 0]);
}

#[test]
fn test_owned_thread_callback_stops_itself() {
    let result = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&result);
    let thread = OwnedThread::new(move |token: &StopToken| {
        let mut result = sink.lock().unwrap();
        result.push(0);
        if result.len() >= 4 {
            token.stop();
        }
        Ok(())
    });

    {
        let _thread = thread.scoped().unwrap();
    }

    assert!(thread.stopped().is_set());
    assert_eq!(*result.lock().unwrap(), vec![0]);
}

#[test]
fn test_scoped_looping_thread_runs_exactly_four_times() {
    let runs = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&runs);
    let thread = OwnedThread::with_config(
        move |token: &StopToken| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 4 {
                token.stop();
            }
            Ok(())
        },
        ThreadConfig::new("four").looping(true),
    );

    {
        let _thread = thread.scoped().unwrap();
    }

    assert_eq!(runs.load(Ordering::SeqCst), 4);
    assert!(thread.stopped().is_set());
    assert!(!thread.running().is_set());
}

#[test]
fn test_group_running_requires_all_children() {
    let release = Flag::new();
    let children: Vec<Arc<dyn Lifecycle>> = (0..3)
        .map(|i| {
            let release = release.clone();
            Arc::new(OwnedThread::with_config(
                move |_token: &StopToken| {
                    release.wait(None);
                    Ok(())
                },
                ThreadConfig::new(format!("gated-{i}")),
            )) as Arc<dyn Lifecycle>
        })
        .collect();
    let group = LifecycleGroup::new(children);

    let transitions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transitions);
    let observed = group.running().clone();
    group.running().on_set(move || {
        if observed.is_set() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    group.start().unwrap();
    assert!(group.running().wait(Some(Duration::from_secs(5))));
    for child in group.children() {
        assert!(child.running().is_set());
    }

    release.set();
    assert!(group.stopped().wait(Some(Duration::from_secs(5))));
    group.join(Some(Duration::from_secs(5))).unwrap();

    assert_eq!(transitions.load(Ordering::SeqCst), 1);
    assert!(!group.running().is_set());
}

#[test]
fn test_group_stops_children_in_reverse_start_order() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let stopped = Arc::new(Mutex::new(Vec::new()));

    let children: Vec<Arc<dyn Lifecycle>> = ["first", "second", "third"]
        .into_iter()
        .map(|tag| {
            let started = Arc::clone(&started);
            let stopped = Arc::clone(&stopped);
            Arc::new(
                LifecycleAdapter::new(tag)
                    .on_start(move || started.lock().unwrap().push(tag))
                    .on_stop(move || stopped.lock().unwrap().push(tag)),
            ) as Arc<dyn Lifecycle>
        })
        .collect();
    let group = LifecycleGroup::new(children);

    group.start().unwrap();
    group.stop();

    assert_eq!(*started.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(*stopped.lock().unwrap(), vec!["third", "second", "first"]);
}

#[test]
fn test_wrapped_duck_object_stops_before_joining() {
    let actions = Arc::new(Mutex::new(Vec::new()));

    let on_stop = Arc::clone(&actions);
    let on_join = Arc::clone(&actions);
    let duck = LifecycleAdapter::new("duck")
        .on_stop(move || on_stop.lock().unwrap().push("stop"))
        .on_join(move |_timeout| on_join.lock().unwrap().push("join"));

    {
        let _duck = duck.scoped().unwrap();
    }

    assert_eq!(*actions.lock().unwrap(), vec!["stop", "join"]);
}

#[test]
fn test_scope_panic_skips_finish_and_join() {
    let actions = Arc::new(Mutex::new(Vec::new()));

    let on_stop = Arc::clone(&actions);
    let on_join = Arc::clone(&actions);
    let duck = LifecycleAdapter::new("duck")
        .on_stop(move || on_stop.lock().unwrap().push("stop"))
        .on_join(move |_timeout| on_join.lock().unwrap().push("join"));

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _duck = duck.scoped().unwrap();
        panic!("scope body failed");
    }));

    assert!(outcome.is_err());
    assert_eq!(*actions.lock().unwrap(), vec!["stop"]);
}

#[test]
fn test_facade_log_routes_diagnostics() {
    let _ = env_logger::builder().is_test(true).try_init();

    let thread = OwnedThread::with_config(
        |_token: &StopToken| Ok(()),
        ThreadConfig::new("logged").with_log(Arc::new(FacadeLog)),
    );

    {
        let _thread = thread.scoped().unwrap();
    }
    assert!(thread.stopped().is_set());
}

#[test]
fn test_stopped_never_reverts_after_join() {
    let thread = OwnedThread::new(|_token: &StopToken| Ok(()));
    thread.start().unwrap();
    thread.join(Some(Duration::from_secs(5))).unwrap();

    assert!(thread.stopped().is_set());
    assert!(!thread.running().is_set());

    // one-shot: a second start is refused and flags stay settled
    assert!(thread.start().is_err());
    assert!(thread.stopped().is_set());
}
