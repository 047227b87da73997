//! Composition operators.
//!
//! Each operator returns a stream whose producer subscribes to the source and
//! re-emits through its own observer. The producer's cleanup unsubscribes
//! from the source, so cancelling a derived subscription cancels upstream.
//! Upstream subscriptions are only referenced weakly from downstream: the
//! upstream observer already owns the downstream surface, and a strong link
//! back would keep an abandoned chain alive forever.
//! Accumulated state lives inside the producer call, one copy per
//! subscription.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use uuid::Uuid;

use crate::error::StreamError;
use crate::observer::Observer;
use crate::stream::constructors::IntoStream;
use crate::stream::core::Stream;
use crate::subscription::{Cleanup, Subscription, SubscriptionObserver, WeakSubscription};

/// Forward errors and completion from `source` unchanged, with `next`
/// supplied by the operator.
fn relay<T, U, E, N>(
    source: &Stream<T, E>,
    observer: SubscriptionObserver<U, E>,
    next: N,
) -> Result<Option<Cleanup>, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    N: FnMut(T) -> Result<(), E> + 'static,
{
    let on_error = observer.clone();
    let upstream = source.open(
        Observer::new()
            .next(next)
            .error(move |error| on_error.error(error))
            .complete(move || observer.complete()),
    )?;
    Ok(Some(Cleanup::weak(&upstream)))
}

pub(crate) fn map<T, U, E, F>(source: &Stream<T, E>, f: F) -> Stream<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    F: Fn(T) -> Result<U, E> + 'static,
{
    let source = source.clone();
    let f = Rc::new(f);
    Stream::new(move |observer: SubscriptionObserver<U, E>| {
        let f = Rc::clone(&f);
        let downstream = observer.clone();
        relay(&source, observer, move |value| {
            if downstream.closed() {
                return Ok(());
            }
            match f(value) {
                Ok(mapped) => downstream.next(mapped),
                Err(error) => downstream.error(error),
            }
        })
    })
}

pub(crate) fn filter<T, E, F>(source: &Stream<T, E>, predicate: F) -> Stream<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(&T) -> Result<bool, E> + 'static,
{
    let source = source.clone();
    let predicate = Rc::new(predicate);
    Stream::new(move |observer: SubscriptionObserver<T, E>| {
        let predicate = Rc::clone(&predicate);
        let downstream = observer.clone();
        relay(&source, observer, move |value| {
            if downstream.closed() {
                return Ok(());
            }
            match predicate(&value) {
                Ok(true) => downstream.next(value),
                Ok(false) => Ok(()),
                Err(error) => downstream.error(error),
            }
        })
    })
}

pub(crate) fn reduce<T, E, F>(source: &Stream<T, E>, f: F) -> Stream<T, E>
where
    T: 'static,
    E: From<StreamError> + 'static,
    F: Fn(T, T) -> Result<T, E> + 'static,
{
    accumulate(
        source,
        move |acc, value| match acc {
            Some(acc) => f(acc, value),
            None => Ok(value),
        },
        || Err(StreamError::EmptySequence.into()),
    )
}

pub(crate) fn fold<T, A, E, F>(source: &Stream<T, E>, seed: A, f: F) -> Stream<A, E>
where
    T: 'static,
    A: Clone + 'static,
    E: 'static,
    F: Fn(A, T) -> Result<A, E> + 'static,
{
    let empty = seed.clone();
    accumulate(
        source,
        move |acc, value| f(acc.unwrap_or_else(|| seed.clone()), value),
        move || Ok(empty.clone()),
    )
}

/// Shared body of `reduce` and `fold`.
///
/// `step` receives `None` for the first value. `on_empty` decides what a
/// source that completes without values produces.
fn accumulate<T, A, E, S, Z>(source: &Stream<T, E>, step: S, on_empty: Z) -> Stream<A, E>
where
    T: 'static,
    A: 'static,
    E: 'static,
    S: Fn(Option<A>, T) -> Result<A, E> + 'static,
    Z: Fn() -> Result<A, E> + 'static,
{
    let source = source.clone();
    let step = Rc::new(step);
    let on_empty = Rc::new(on_empty);
    Stream::new(move |observer: SubscriptionObserver<A, E>| {
        let acc: Rc<RefCell<Option<A>>> = Rc::new(RefCell::new(None));

        let step = Rc::clone(&step);
        let on_next = observer.clone();
        let next_acc = Rc::clone(&acc);

        let on_empty = Rc::clone(&on_empty);
        let on_error = observer.clone();

        let upstream = source.open(
            Observer::new()
                .next(move |value| {
                    if on_next.closed() {
                        return Ok(());
                    }
                    let current = next_acc.borrow_mut().take();
                    match step(current, value) {
                        Ok(folded) => {
                            *next_acc.borrow_mut() = Some(folded);
                            Ok(())
                        }
                        Err(error) => on_next.error(error),
                    }
                })
                .error(move |error| on_error.error(error))
                .complete(move || {
                    let result = match acc.borrow_mut().take() {
                        Some(folded) => Ok(folded),
                        None => on_empty(),
                    };
                    match result {
                        Ok(folded) => {
                            observer.next(folded)?;
                            observer.complete()
                        }
                        Err(error) => observer.error(error),
                    }
                }),
        )?;
        Ok(Some(Cleanup::weak(&upstream)))
    })
}

/// Bookkeeping for one `flat_map` subscription.
///
/// Inner subscriptions are held weakly, keyed by id. An inner stream whose
/// producer lets go without completing stays counted as open.
struct Merge {
    source_done: Cell<bool>,
    inner: RefCell<Vec<(Uuid, WeakSubscription)>>,
}

impl Merge {
    fn track(&self, subscription: &Subscription) {
        self.inner
            .borrow_mut()
            .push((subscription.id(), subscription.downgrade()));
    }

    fn release(&self, id: Uuid) {
        self.inner.borrow_mut().retain(|(tracked, _)| *tracked != id);
    }

    fn is_done(&self) -> bool {
        self.source_done.get() && self.inner.borrow().is_empty()
    }

    fn cancel_inner(&self) {
        let inner: Vec<(Uuid, WeakSubscription)> = self.inner.borrow_mut().drain(..).collect();
        if !inner.is_empty() {
            log::debug!("flat_map: cancelling {} inner subscriptions", inner.len());
        }
        for subscription in inner.iter().filter_map(|(_, weak)| weak.upgrade()) {
            subscription.unsubscribe();
        }
    }
}

fn complete_if_done<U, E>(merge: &Merge, observer: &SubscriptionObserver<U, E>) -> Result<(), E> {
    if merge.is_done() {
        observer.complete()
    } else {
        Ok(())
    }
}

pub(crate) fn flat_map<T, U, E, S, F>(source: &Stream<T, E>, f: F) -> Stream<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    S: IntoStream<U, E>,
    F: Fn(T) -> Result<S, E> + 'static,
{
    let source = source.clone();
    let f = Rc::new(f);
    Stream::new(move |observer: SubscriptionObserver<U, E>| {
        let merge = Rc::new(Merge {
            source_done: Cell::new(false),
            inner: RefCell::new(Vec::new()),
        });

        let f = Rc::clone(&f);
        let on_next = observer.clone();
        let next_merge = Rc::clone(&merge);

        let on_error = observer.clone();
        let on_complete = observer.clone();
        let complete_merge = Rc::clone(&merge);

        let outer = source.open(
            Observer::new()
                .next(move |value| {
                    if on_next.closed() {
                        return Ok(());
                    }
                    let inner = match f(value) {
                        Ok(inner) => inner.into_stream(),
                        Err(error) => return on_next.error(error),
                    };
                    inner_subscribe(&inner, &next_merge, &on_next)
                })
                .error(move |error| on_error.error(error))
                .complete(move || {
                    complete_merge.source_done.set(true);
                    complete_if_done(&complete_merge, &on_complete)
                }),
        )?;

        let outer = outer.downgrade();
        Ok(Some(Cleanup::new(move || {
            merge.cancel_inner();
            if let Some(outer) = outer.upgrade() {
                outer.unsubscribe();
            }
        })))
    })
}

fn inner_subscribe<U, E>(
    inner: &Stream<U, E>,
    merge: &Rc<Merge>,
    observer: &SubscriptionObserver<U, E>,
) -> Result<(), E>
where
    U: 'static,
    E: 'static,
{
    let id: Rc<Cell<Option<Uuid>>> = Rc::new(Cell::new(None));

    let start_merge = Rc::clone(merge);
    let start_id = Rc::clone(&id);

    let on_next = observer.clone();
    let on_error = observer.clone();

    let on_complete = observer.clone();
    let complete_merge = Rc::clone(merge);

    inner.open(
        Observer::new()
            .start(move |subscription| {
                start_id.set(Some(subscription.id()));
                start_merge.track(subscription);
                Ok(())
            })
            .next(move |value| on_next.next(value))
            .error(move |error| on_error.error(error))
            .complete(move || {
                if let Some(id) = id.get() {
                    complete_merge.release(id);
                }
                complete_if_done(&complete_merge, &on_complete)
            }),
    )?;
    Ok(())
}
