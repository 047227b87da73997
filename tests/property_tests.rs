use quickcheck::{quickcheck, TestResult};
use rs2_observe::{from, of, Cleanup, Observable, Observer, Stream, StreamError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Event<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

fn collect<T: Clone + 'static>(stream: &Stream<T>) -> Vec<Event<T>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let (on_next, on_error, on_complete) = (events.clone(), events.clone(), events.clone());
    stream
        .subscribe(
            Observer::new()
                .next(move |value| {
                    on_next.borrow_mut().push(Event::Next(value));
                    Ok(())
                })
                .error(move |error| {
                    on_error.borrow_mut().push(Event::Error(error));
                    Ok(())
                })
                .complete(move || {
                    on_complete.borrow_mut().push(Event::Complete);
                    Ok(())
                }),
        )
        .unwrap();
    let collected = events.borrow().clone();
    collected
}

fn terminals<T>(events: &[Event<T>]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::Error(_) | Event::Complete))
        .count()
}

#[test]
fn prop_cleanup_runs_exactly_once() {
    fn prop(unsubscribes: u8) -> bool {
        let cleanups = Rc::new(Cell::new(0));
        let counter = cleanups.clone();
        let stream: Stream<i32> = Stream::new(move |_observer| {
            let counter = counter.clone();
            Ok(Some(Cleanup::new(move || counter.set(counter.get() + 1))))
        });
        let subscription = stream.subscribe(Observer::new()).unwrap();
        for _ in 0..=unsubscribes {
            subscription.unsubscribe();
        }
        subscription.closed() && cleanups.get() == 1
    }
    quickcheck(prop as fn(u8) -> bool);
}

#[test]
fn prop_of_emits_everything_in_order() {
    fn prop(items: Vec<i32>) -> bool {
        let stream: Stream<i32> = of(items.clone());
        let mut expected: Vec<Event<i32>> = items.into_iter().map(Event::Next).collect();
        expected.push(Event::Complete);
        collect(&stream) == expected
    }
    quickcheck(prop as fn(Vec<i32>) -> bool);
}

#[test]
fn prop_map_failure_is_single_terminal() {
    fn prop(items: Vec<i32>, fail_at: usize) -> TestResult {
        if items.is_empty() {
            return TestResult::discard();
        }
        let fail_at = fail_at % items.len();
        let position = Rc::new(Cell::new(0usize));
        let stream: Stream<i32> = from(items.clone());
        let mapped = stream.map(move |x| {
            let index = position.get();
            position.set(index + 1);
            if index == fail_at {
                Err(StreamError::Custom(format!("failed at {}", index)))
            } else {
                Ok(x)
            }
        });

        let events = collect(&mapped);
        let mut expected: Vec<Event<i32>> = items[..fail_at].iter().copied().map(Event::Next).collect();
        expected.push(Event::Error(StreamError::Custom(format!("failed at {}", fail_at))));
        TestResult::from_bool(events == expected && terminals(&events) == 1)
    }
    quickcheck(prop as fn(Vec<i32>, usize) -> TestResult);
}

#[test]
fn prop_flatten_keeps_every_value() {
    fn prop(groups: Vec<Vec<i16>>) -> bool {
        let outer: Stream<Vec<i16>> = of(groups.clone());
        let merged: Stream<i16> = outer.flatten();
        let events = collect(&merged);

        let mut expected: Vec<Event<i16>> = groups.into_iter().flatten().map(Event::Next).collect();
        expected.push(Event::Complete);
        events == expected && terminals(&events) == 1
    }
    quickcheck(prop as fn(Vec<Vec<i16>>) -> bool);
}

#[test]
fn prop_fold_matches_iterator_fold() {
    fn prop(items: Vec<i32>, seed: i64) -> bool {
        let stream: Stream<i32> = of(items.clone());
        let folded = stream.fold(seed, |acc, x| Ok(acc.wrapping_add(x as i64)));
        let expected = items.iter().fold(seed, |acc, x| acc.wrapping_add(*x as i64));
        collect(&folded) == vec![Event::Next(expected), Event::Complete]
    }
    quickcheck(prop as fn(Vec<i32>, i64) -> bool);
}

#[test]
fn prop_reduce_without_values_is_empty_sequence() {
    fn prop(items: Vec<i32>) -> bool {
        let stream: Stream<i32> = of(items.clone());
        let reduced = stream.reduce(|acc, x| Ok(acc.max(x)));
        let events = collect(&reduced);
        match items.iter().max() {
            Some(max) => events == vec![Event::Next(*max), Event::Complete],
            None => events == vec![Event::Error(StreamError::EmptySequence)],
        }
    }
    quickcheck(prop as fn(Vec<i32>) -> bool);
}
