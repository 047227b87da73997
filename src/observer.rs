//! The consumer side of a subscription.
//!
//! An [`Observer`] is a bundle of four optional callbacks. Each one is either
//! present or absent, and what happens when one is absent is part of the
//! protocol: a missing `next` or `complete` silently drops the notification,
//! a missing `error` leaves the error uncaught.

use std::cell::RefCell;
use std::fmt;

use crate::subscription::Subscription;

type StartFn<E> = dyn FnMut(&Subscription) -> Result<(), E>;
type NextFn<T, E> = dyn FnMut(T) -> Result<(), E>;
type ErrorFn<E> = dyn FnMut(E) -> Result<(), E>;
type CompleteFn<E> = dyn FnMut() -> Result<(), E>;

/// A single consumer callback.
///
/// Callbacks are `FnMut`, so one cannot be entered again while it is still
/// running. A nested invocation is reported back as `None`; the subscription
/// checks `is_running` first and queues nested values instead.
struct Callback<F: ?Sized> {
    f: RefCell<Box<F>>,
}

impl<F: ?Sized> Callback<F> {
    fn new(f: Box<F>) -> Self {
        Self { f: RefCell::new(f) }
    }

    fn is_running(&self) -> bool {
        self.f.try_borrow().is_err()
    }

    fn invoke<R>(&self, call: impl FnOnce(&mut F) -> R) -> Option<R> {
        match self.f.try_borrow_mut() {
            Ok(mut f) => Some(call(&mut **f)),
            Err(_) => None,
        }
    }
}

/// A consumer of stream notifications.
///
/// ```
/// use rs2_observe::{Observer, StreamError};
///
/// let observer: Observer<i32, StreamError> = Observer::new()
///     .next(|value| {
///         println!("got {}", value);
///         Ok(())
///     })
///     .complete(|| Ok(()));
/// assert!(observer.has_next());
/// assert!(!observer.has_error());
/// ```
pub struct Observer<T, E> {
    start: Option<Callback<StartFn<E>>>,
    next: Option<Callback<NextFn<T, E>>>,
    error: Option<Callback<ErrorFn<E>>>,
    complete: Option<Callback<CompleteFn<E>>>,
}

impl<T, E> Observer<T, E> {
    /// Create an observer with no callbacks at all
    pub fn new() -> Self {
        Self {
            start: None,
            next: None,
            error: None,
            complete: None,
        }
    }

    /// Set the callback invoked with the subscription before the producer runs.
    ///
    /// Unsubscribing from inside `start` prevents the producer from running.
    /// An `Err` returned here escapes `subscribe` directly.
    pub fn start<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Subscription) -> Result<(), E> + 'static,
    {
        self.start = Some(Callback::new(Box::new(f)));
        self
    }

    /// Set the value callback
    pub fn next<F>(mut self, f: F) -> Self
    where
        F: FnMut(T) -> Result<(), E> + 'static,
    {
        self.next = Some(Callback::new(Box::new(f)));
        self
    }

    /// Set the error callback
    pub fn error<F>(mut self, f: F) -> Self
    where
        F: FnMut(E) -> Result<(), E> + 'static,
    {
        self.error = Some(Callback::new(Box::new(f)));
        self
    }

    /// Set the completion callback
    pub fn complete<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> Result<(), E> + 'static,
    {
        self.complete = Some(Callback::new(Box::new(f)));
        self
    }

    /// Build an observer out of bare `next`, `error` and `complete` functions
    pub fn from_fns<N, R, C>(next: N, error: R, complete: C) -> Self
    where
        N: FnMut(T) -> Result<(), E> + 'static,
        R: FnMut(E) -> Result<(), E> + 'static,
        C: FnMut() -> Result<(), E> + 'static,
    {
        Self::new().next(next).error(error).complete(complete)
    }

    pub fn has_start(&self) -> bool {
        self.start.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_complete(&self) -> bool {
        self.complete.is_some()
    }

    /// True while the `next` callback is on the stack
    pub(crate) fn next_running(&self) -> bool {
        self.next.as_ref().is_some_and(Callback::is_running)
    }

    pub(crate) fn call_start(&self, subscription: &Subscription) -> Result<(), E> {
        let Some(start) = &self.start else {
            return Ok(());
        };
        start.invoke(|f| f(subscription)).unwrap_or_else(|| {
            log::warn!("subscription {}: dropped re-entrant start call", subscription.id());
            Ok(())
        })
    }

    pub(crate) fn call_next(&self, value: T) -> Result<(), E> {
        let Some(next) = &self.next else {
            return Ok(());
        };
        next.invoke(|f| f(value)).unwrap_or_else(|| {
            log::warn!("dropped re-entrant next notification");
            Ok(())
        })
    }

    /// Deliver an error. Without an error callback the value comes straight
    /// back as `Err`, since nobody is left to take it.
    pub(crate) fn call_error(&self, error: E) -> Result<(), E> {
        let Some(handler) = &self.error else {
            return Err(error);
        };
        let mut pending = Some(error);
        match handler.invoke(|f| match pending.take() {
            Some(error) => f(error),
            None => Ok(()),
        }) {
            Some(result) => result,
            None => match pending {
                Some(error) => Err(error),
                None => Ok(()),
            },
        }
    }

    pub(crate) fn call_complete(&self) -> Result<(), E> {
        let Some(complete) = &self.complete else {
            return Ok(());
        };
        complete.invoke(|f| f()).unwrap_or_else(|| {
            log::warn!("dropped re-entrant complete notification");
            Ok(())
        })
    }
}

impl<T, E> Default for Observer<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("start", &self.has_start())
            .field("next", &self.has_next())
            .field("error", &self.has_error())
            .field("complete", &self.has_complete())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use std::rc::Rc;

    #[test]
    fn missing_error_callback_hands_the_error_back() {
        let observer: Observer<i32, StreamError> = Observer::new();
        let result = observer.call_error(StreamError::Custom("boom".into()));
        assert_eq!(result, Err(StreamError::Custom("boom".into())));
    }

    #[test]
    fn missing_next_and_complete_are_silent() {
        let observer: Observer<i32, StreamError> = Observer::new();
        assert_eq!(observer.call_next(1), Ok(()));
        assert_eq!(observer.call_complete(), Ok(()));
    }

    #[test]
    fn next_is_running_only_inside_the_callback() {
        let slot: Rc<RefCell<Option<Rc<Observer<i32, StreamError>>>>> = Rc::new(RefCell::new(None));
        let running = Rc::new(RefCell::new(Vec::new()));

        let observer = {
            let slot = slot.clone();
            let running = running.clone();
            Rc::new(Observer::new().next(move |_value: i32| {
                let inner = slot.borrow().clone();
                if let Some(observer) = inner {
                    running.borrow_mut().push(observer.next_running());
                }
                Ok(())
            }))
        };
        *slot.borrow_mut() = Some(observer.clone());

        assert!(!observer.next_running());
        assert_eq!(observer.call_next(1), Ok(()));
        assert!(!observer.next_running());
        assert_eq!(*running.borrow(), vec![true]);
        slot.borrow_mut().take();
    }

    #[test]
    fn debug_lists_present_callbacks() {
        let observer: Observer<i32, StreamError> = Observer::new().next(|_| Ok(()));
        let rendered = format!("{:?}", observer);
        assert!(rendered.contains("next: true"));
        assert!(rendered.contains("error: false"));
    }
}
