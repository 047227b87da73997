//! Core stream type and the `Observable` trait.
//!
//! A [`Stream`] is an immutable wrapper around a producer function. Nothing
//! happens until it is subscribed, and every subscription runs the producer
//! afresh against its own [`SubscriptionObserver`].

use std::fmt;
use std::rc::Rc;

use crate::bridge::{self, AsyncBridge};
use crate::error::StreamError;
use crate::observer::Observer;
use crate::stream::constructors::{self, IntoStream};
use crate::stream::for_each::{self, ForEach};
use crate::stream::operators;
use crate::stream_configuration::BridgeConfig;
use crate::subscription::{self, Cleanup, Subscription, SubscriptionObserver};

type Producer<T, E> = dyn Fn(SubscriptionObserver<T, E>) -> Result<Option<Cleanup>, E>;

/// A lazily-started, cancellable, push-based sequence of values
pub struct Stream<T, E = StreamError> {
    producer: Rc<Producer<T, E>>,
}

impl<T, E> Clone for Stream<T, E> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T: 'static, E: 'static> Stream<T, E> {
    /// Create a stream from a producer function.
    ///
    /// The producer runs once per subscription. It may push notifications
    /// synchronously, or keep the observer and push later. An `Err` it
    /// returns is delivered as an error notification. The optional
    /// [`Cleanup`] runs when the subscription closes.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(SubscriptionObserver<T, E>) -> Result<Option<Cleanup>, E> + 'static,
    {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// True if both handles wrap the very same producer
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.producer) as *const () == Rc::as_ptr(&other.producer) as *const ()
    }

    pub(crate) fn open(&self, observer: Observer<T, E>) -> Result<Subscription, E> {
        subscription::open(observer, &*self.producer)
    }
}

impl<T, E> fmt::Debug for Stream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

/// Subscription entry points and composition operators.
///
/// Implementors name their *species*: the type operators produce. `Stream`
/// names itself; a wrapper type that names itself keeps its type across a
/// whole operator chain instead of degrading to a plain `Stream`.
pub trait Observable<T: 'static, E: 'static>: Sized {
    /// The type derived streams are built as
    type Species<U: 'static>: Observable<U, E>;

    /// The underlying stream
    fn as_stream(&self) -> &Stream<T, E>;

    /// Build a derived stream of this species
    fn species<U: 'static>(stream: Stream<U, E>) -> Self::Species<U>;

    /// Emit `values` in order, then complete, as a stream of this species.
    ///
    /// ```
    /// use rs2_observe::{Observable, Stream};
    ///
    /// let numbers = Stream::<i32>::of(vec![1, 2, 3]);
    /// ```
    fn of<I>(values: I) -> Self::Species<T>
    where
        T: Clone,
        I: IntoIterator<Item = T>,
    {
        Self::species(constructors::of(values))
    }

    /// Convert anything stream-like into a stream of this species
    fn from_source<S>(source: S) -> Self::Species<T>
    where
        S: IntoStream<T, E>,
    {
        Self::species(source.into_stream())
    }

    /// Subscribe with a full observer.
    ///
    /// Returns `Err` if the observer's `start` callback fails, or if an
    /// error notification raised while subscribing went uncaught.
    fn subscribe(&self, observer: Observer<T, E>) -> Result<Subscription, E> {
        self.as_stream().open(observer)
    }

    /// Subscribe with a bare value callback
    fn subscribe_next<N>(&self, next: N) -> Result<Subscription, E>
    where
        N: FnMut(T) -> Result<(), E> + 'static,
    {
        self.subscribe(Observer::new().next(next))
    }

    /// Subscribe with bare `next`, `error` and `complete` callbacks
    fn subscribe_all<N, R, C>(&self, next: N, error: R, complete: C) -> Result<Subscription, E>
    where
        N: FnMut(T) -> Result<(), E> + 'static,
        R: FnMut(E) -> Result<(), E> + 'static,
        C: FnMut() -> Result<(), E> + 'static,
    {
        self.subscribe(Observer::from_fns(next, error, complete))
    }

    /// Run `f` for every value; the returned future settles on termination.
    ///
    /// If `f` fails, the future fails with that error and the source is
    /// unsubscribed.
    fn for_each<F>(&self, f: F) -> ForEach<E>
    where
        F: FnMut(T) -> Result<(), E> + 'static,
        E: From<StreamError>,
    {
        for_each::for_each(self.as_stream(), f)
    }

    /// Transform every value
    fn map<U, F>(&self, f: F) -> Self::Species<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U, E> + 'static,
    {
        Self::species(operators::map(self.as_stream(), f))
    }

    /// Keep the values the predicate accepts
    fn filter<F>(&self, predicate: F) -> Self::Species<T>
    where
        F: Fn(&T) -> Result<bool, E> + 'static,
    {
        Self::species(operators::filter(self.as_stream(), predicate))
    }

    /// Fold the values into one, using the first value as the seed.
    ///
    /// Fails with [`StreamError::EmptySequence`] if the source completes
    /// without producing anything.
    fn reduce<F>(&self, f: F) -> Self::Species<T>
    where
        F: Fn(T, T) -> Result<T, E> + 'static,
        E: From<StreamError>,
    {
        Self::species(operators::reduce(self.as_stream(), f))
    }

    /// Fold the values into one, starting from `seed`
    fn fold<A, F>(&self, seed: A, f: F) -> Self::Species<A>
    where
        A: Clone + 'static,
        F: Fn(A, T) -> Result<A, E> + 'static,
    {
        Self::species(operators::fold(self.as_stream(), seed, f))
    }

    /// Map every value to a stream and merge their values.
    ///
    /// Completes once the source and every inner stream have completed.
    /// Unsubscribing cancels the source and all open inner streams.
    fn flat_map<U, S, F>(&self, f: F) -> Self::Species<U>
    where
        U: 'static,
        S: IntoStream<U, E>,
        F: Fn(T) -> Result<S, E> + 'static,
    {
        Self::species(operators::flat_map(self.as_stream(), f))
    }

    /// Merge a stream of streams
    fn flatten<U>(&self) -> Self::Species<U>
    where
        U: 'static,
        T: IntoStream<U, E>,
    {
        self.flat_map::<U, T, _>(Ok)
    }

    /// Subscribe and expose the notifications as an async stream.
    ///
    /// Dropping the returned bridge unsubscribes.
    fn into_async(&self, config: BridgeConfig) -> AsyncBridge<T, E>
    where
        E: From<StreamError>,
    {
        bridge::bridge(self.as_stream(), config)
    }
}

impl<T: 'static, E: 'static> Observable<T, E> for Stream<T, E> {
    type Species<U: 'static> = Stream<U, E>;

    fn as_stream(&self) -> &Stream<T, E> {
        self
    }

    fn species<U: 'static>(stream: Stream<U, E>) -> Stream<U, E> {
        stream
    }
}
