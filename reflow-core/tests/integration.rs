//! End-to-end scenarios exercising both reactive models and the bridge.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use reflow_core::signal::Runtime;
use reflow_core::stream::{combine_latest, BehaviorSubject, Observable, Observer, Subject};
use reflow_core::timer::TimerService;

#[derive(Clone, Debug, PartialEq)]
struct Product {
    name: &'static str,
    category: &'static str,
    available: bool,
}

fn catalog() -> Vec<Product> {
    vec![
        Product {
            name: "abacus",
            category: "toys",
            available: true,
        },
        Product {
            name: "keyboard",
            category: "office",
            available: true,
        },
        Product {
            name: "cable",
            category: "office",
            available: false,
        },
    ]
}

/// Filter rule shared by the push and pull renditions of the search page.
fn matches(product: &Product, term: &str, only_available: bool, category: &str) -> bool {
    product.name.contains(term)
        && (!only_available || product.available)
        && (category.is_empty() || product.category == category)
}

#[test]
fn pull_side_product_filter_recomputes_minimally() {
    let rt = Runtime::new();
    let term = rt.cell(String::new());
    let only_available = rt.cell(false);
    let category = rt.cell(String::new());

    let filtered = rt.computed({
        let term = term.clone();
        let only_available = only_available.clone();
        let category = category.clone();
        move |scope| {
            let term = scope.get(&term);
            let only_available = scope.get(&only_available);
            let category = scope.get(&category);
            catalog()
                .into_iter()
                .filter(|p| matches(p, &term, only_available, &category))
                .collect::<Vec<_>>()
        }
    });

    let runs = Arc::new(Mutex::new(0usize));
    let runs_clone = runs.clone();
    let filtered_clone = filtered.clone();
    let _watch = rt.effect(move |scope| {
        let _ = scope.get(&filtered_clone);
        *runs_clone.lock() += 1;
    });
    assert_eq!(*runs.lock(), 1);
    assert_eq!(filtered.get().len(), 3);

    // "ab" matches both "abacus" and "cable" while availability is off.
    term.set("ab".to_string());
    assert_eq!(filtered.get().len(), 2);
    assert_eq!(*runs.lock(), 2);

    // The availability toggle narrows the match to the first product.
    only_available.set(true);
    assert_eq!(filtered.get(), vec![catalog().remove(0)]);
    assert_eq!(*runs.lock(), 3);

    // Rewriting an input with an equal value propagates nothing.
    only_available.set(true);
    assert_eq!(*runs.lock(), 3);
}

#[test]
fn diamond_dependency_is_glitch_free() {
    let rt = Runtime::new();
    let base = rt.cell(1);

    let left = rt.computed({
        let base = base.clone();
        move |scope| scope.get(&base) + 1
    });
    let right = rt.computed({
        let base = base.clone();
        move |scope| scope.get(&base) * 10
    });

    let joins = Arc::new(Mutex::new(Vec::new()));
    let joins_clone = joins.clone();
    let join = rt.computed({
        let left = left.clone();
        let right = right.clone();
        move |scope| {
            let v = (scope.get(&left), scope.get(&right));
            joins_clone.lock().push(v);
            v
        }
    });

    assert_eq!(join.get(), (2, 10));
    base.set(3);
    assert_eq!(join.get(), (4, 30));

    // One evaluation per distinct base value, never a half-updated pair.
    assert_eq!(*joins.lock(), vec![(2, 10), (4, 30)]);
}

#[test]
fn push_side_filter_pipeline_recomputes_per_criteria_change() {
    let term = BehaviorSubject::new(String::new());
    let only_available = BehaviorSubject::new(false);
    let category = BehaviorSubject::new(String::new());

    let criteria = combine_latest(vec![
        term.as_observable(),
        only_available
            .as_observable()
            .map(|b: bool| b.to_string()),
        category.as_observable(),
    ]);

    let recomputes = Arc::new(Mutex::new(0usize));
    let recomputes_clone = recomputes.clone();
    let results = criteria.map(move |c: Vec<String>| {
        *recomputes_clone.lock() += 1;
        let only_available = c[1] == "true";
        catalog()
            .into_iter()
            .filter(|p| matches(p, &c[0], only_available, &c[2]))
            .collect::<Vec<_>>()
    });

    let latest = Arc::new(Mutex::new(Vec::new()));
    let latest_clone = latest.clone();
    let _sub = results.subscribe_next(move |r| *latest_clone.lock() = r);

    // All three behavior subjects replay, so the pipeline emits once up
    // front, then once per subsequent criteria write.
    assert_eq!(*recomputes.lock(), 1);
    assert_eq!(latest.lock().len(), 3);

    term.next("ab".to_string());
    assert_eq!(*recomputes.lock(), 2);
    assert_eq!(latest.lock().len(), 2);

    only_available.next(true);
    assert_eq!(*recomputes.lock(), 3);
    assert_eq!(*latest.lock(), vec![catalog().remove(0)]);

    // Push model has no equality suppression: an equal rewrite recomputes.
    only_available.next(true);
    assert_eq!(*recomputes.lock(), 4);
}

#[test]
fn debounced_search_switches_to_latest_query() {
    let timers = TimerService::new();
    let keystrokes: Subject<&str> = Subject::new();
    let responses: Subject<Vec<&str>> = Subject::new();

    let lookups = Arc::new(Mutex::new(Vec::new()));
    let lookups_clone = lookups.clone();
    let results = keystrokes
        .as_observable()
        .debounce_time(Duration::from_millis(100), &timers)
        .switch_map({
            let responses = responses.clone();
            move |query: &str| {
                lookups_clone.lock().push(query);
                responses.as_observable()
            }
        });

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let delivered_clone = delivered.clone();
    let _sub = results.subscribe_next(move |r| delivered_clone.lock().push(r));

    // Rapid typing: only the settled query reaches the lookup.
    keystrokes.next("a");
    timers.advance(Duration::from_millis(50));
    keystrokes.next("ab");
    timers.advance(Duration::from_millis(100));

    assert_eq!(*lookups.lock(), vec!["ab"]);
    responses.next(vec!["abacus"]);
    assert_eq!(*delivered.lock(), vec![vec!["abacus"]]);

    // A newer settled query supersedes the in-flight one.
    keystrokes.next("abc");
    timers.advance(Duration::from_millis(100));
    responses.next(vec!["stale-then-fresh"]);

    assert_eq!(*lookups.lock(), vec!["ab", "abc"]);
    assert_eq!(delivered.lock().len(), 2);
}

#[test]
fn debounced_form_validation_settles_once() {
    let rt = Runtime::new();
    let timers = TimerService::new();
    let input: Subject<String> = Subject::new();
    let taken = ["jon", "ada"];

    // Keystrokes settle through debounce, too-short names never reach the
    // check, and the seeded bridge hands the candidate to the pull side.
    let candidates = input
        .as_observable()
        .debounce_time(Duration::from_millis(300), &timers)
        .filter(|name: &String| name.len() >= 3)
        .start_with(String::new());

    let bridge = rt.bridge(&candidates, String::new());
    let verdict = rt.computed({
        let candidate = bridge.cell().clone();
        move |scope| {
            let name = scope.get(&candidate);
            if name.is_empty() {
                "pending".to_string()
            } else if taken.contains(&name.as_str()) {
                format!("{name} is taken")
            } else {
                format!("{name} is free")
            }
        }
    });

    assert_eq!(verdict.get(), "pending");

    for chunk in ["j", "jo"] {
        input.next(chunk.to_string());
        timers.advance(Duration::from_millis(100));
    }
    timers.advance(Duration::from_millis(300));
    assert_eq!(verdict.get(), "pending");

    input.next("jon".to_string());
    timers.advance(Duration::from_millis(300));
    assert_eq!(verdict.get(), "jon is taken");

    input.next("jona".to_string());
    timers.advance(Duration::from_millis(300));
    assert_eq!(verdict.get(), "jona is free");
}

#[test]
fn bridge_feeds_push_source_into_pull_graph() {
    let rt = Runtime::new();
    let products = Observable::of(vec![catalog()]);
    let bridge = rt.bridge(&products, Vec::new());

    let names = rt.computed({
        let cell = bridge.cell().clone();
        move |scope| {
            scope
                .get(&cell)
                .iter()
                .map(|p: &Product| p.name)
                .collect::<Vec<_>>()
        }
    });

    // `of` emits synchronously; the cell holds the full catalog.
    assert!(bridge.is_complete());
    assert_eq!(names.get(), vec!["abacus", "keyboard", "cable"]);
}

#[test]
fn effect_write_runs_follow_up_pass_to_completion() {
    let rt = Runtime::new();
    let source = rt.cell(0);
    let mirror = rt.cell(-1);

    let _copy = rt.effect({
        let source = source.clone();
        let mirror = mirror.clone();
        move |scope| {
            let v = scope.get(&source);
            mirror.set(v);
        }
    });

    let observed = Arc::new(Mutex::new(Vec::new()));
    let observed_clone = observed.clone();
    let _watch = rt.effect({
        let mirror = mirror.clone();
        move |scope| observed_clone.lock().push(scope.get(&mirror))
    });

    source.set(7);
    assert_eq!(mirror.get(), 7);
    assert_eq!(*observed.lock(), vec![0, 7]);
}

#[test]
fn terminal_events_latch_and_replay_to_late_subscribers() {
    let subject: Subject<i32> = Subject::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let events_err = events.clone();
    let events_done = events.clone();

    let _sub = subject.as_observable().subscribe(
        Observer::new(move |v| events_clone.lock().push(format!("next {v}")))
            .with_error(move |err| events_err.lock().push(format!("error {err}")))
            .with_complete(move || events_done.lock().push("complete".to_string())),
    );

    subject.next(1);
    subject.complete();
    subject.next(2);

    assert_eq!(
        *events.lock(),
        vec!["next 1".to_string(), "complete".to_string()]
    );

    // Late subscribers to a closed subject get the terminal event only.
    let late = Arc::new(Mutex::new(Vec::new()));
    let late_clone = late.clone();
    let _late_sub = subject.as_observable().subscribe(
        Observer::new(|_v: i32| {}).with_complete(move || late_clone.lock().push("complete")),
    );
    assert_eq!(*late.lock(), vec!["complete"]);
}
