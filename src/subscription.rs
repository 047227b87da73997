//! Subscription lifecycle and the producer-facing notification surface.
//!
//! A subscription is Open until its observer reference is cleared, and then
//! Closed for good. Clearing happens exactly once, through
//! [`Subscription::unsubscribe`] or a terminal notification on the
//! [`SubscriptionObserver`]. Cleanup is taken out of its slot before it
//! runs, so it can never run twice even if it re-enters the subscription.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use crate::observer::Observer;

/// The type-erased view of a subscription's state
trait Closable {
    fn id(&self) -> Uuid;
    fn is_closed(&self) -> bool;
    fn close(&self);
}

struct SubscriptionState<T, E> {
    id: Uuid,
    observer: RefCell<Option<Rc<Observer<T, E>>>>,
    cleanup: RefCell<Option<Cleanup>>,
    // Values pushed while the `next` callback is still running
    backlog: RefCell<VecDeque<T>>,
}

impl<T, E> SubscriptionState<T, E> {
    fn current_observer(&self) -> Option<Rc<Observer<T, E>>> {
        self.observer.borrow().clone()
    }

    fn take_observer(&self) -> Option<Rc<Observer<T, E>>> {
        let observer = self.observer.borrow_mut().take();
        if observer.is_some() {
            let discarded = std::mem::take(&mut *self.backlog.borrow_mut());
            drop(discarded);
        }
        observer
    }

    fn pop_backlog(&self) -> Option<T> {
        self.backlog.borrow_mut().pop_front()
    }

    fn set_cleanup(&self, cleanup: Cleanup) {
        *self.cleanup.borrow_mut() = Some(cleanup);
    }

    fn run_cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            log::debug!("subscription {}: running cleanup", self.id);
            cleanup.run();
        }
    }
}

impl<T, E> Drop for SubscriptionState<T, E> {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!("subscription {}: abandoned while open", self.id);
            self.run_cleanup();
        }
    }
}

impl<T, E> Closable for SubscriptionState<T, E> {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_closed(&self) -> bool {
        self.observer.borrow().is_none()
    }

    fn close(&self) {
        let Some(observer) = self.take_observer() else {
            return;
        };
        log::debug!("subscription {}: unsubscribed", self.id);
        drop(observer);
        self.run_cleanup();
    }
}

/// A handle on one live producer/consumer binding.
///
/// Cloning the handle does not create a new subscription; every clone
/// observes and controls the same one. Dropping a handle does not
/// unsubscribe. A subscription that nothing references anymore, neither a
/// handle nor its producer, can never be notified again; its cleanup runs
/// when it is dropped.
#[derive(Clone)]
pub struct Subscription {
    state: Rc<dyn Closable>,
}

impl Subscription {
    /// Unique identifier, also used in log output
    pub fn id(&self) -> Uuid {
        self.state.id()
    }

    /// True once the subscription has been cancelled or terminated
    pub fn closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Cancel the subscription and run its cleanup.
    ///
    /// Idempotent: calling it on a closed subscription does nothing.
    pub fn unsubscribe(&self) {
        self.state.close();
    }

    pub(crate) fn downgrade(&self) -> WeakSubscription {
        WeakSubscription {
            state: Rc::downgrade(&self.state),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("closed", &self.closed())
            .finish()
    }
}

/// A subscription handle that does not keep the subscription alive
#[derive(Clone)]
pub(crate) struct WeakSubscription {
    state: Weak<dyn Closable>,
}

impl WeakSubscription {
    pub(crate) fn upgrade(&self) -> Option<Subscription> {
        self.state.upgrade().map(|state| Subscription { state })
    }
}

/// Teardown returned by a producer.
///
/// Either an arbitrary action or another subscription to cancel.
pub struct Cleanup {
    action: CleanupAction,
}

enum CleanupAction {
    Run(Box<dyn FnOnce()>),
    Unsubscribe(Subscription),
    UnsubscribeWeak(WeakSubscription),
}

impl Cleanup {
    /// Wrap a teardown action
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            action: CleanupAction::Run(Box::new(f)),
        }
    }

    /// Unsubscribe `subscription` without keeping it alive.
    ///
    /// Operators use this for their upstream subscription, whose observer
    /// holds the downstream surface. Whatever keeps the upstream producer
    /// running keeps the upstream subscription alive.
    pub(crate) fn weak(subscription: &Subscription) -> Self {
        Self {
            action: CleanupAction::UnsubscribeWeak(subscription.downgrade()),
        }
    }

    fn run(self) {
        match self.action {
            CleanupAction::Run(f) => f(),
            CleanupAction::Unsubscribe(subscription) => subscription.unsubscribe(),
            CleanupAction::UnsubscribeWeak(weak) => {
                if let Some(subscription) = weak.upgrade() {
                    subscription.unsubscribe();
                }
            }
        }
    }
}

impl From<Subscription> for Cleanup {
    fn from(subscription: Subscription) -> Self {
        Self {
            action: CleanupAction::Unsubscribe(subscription),
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            CleanupAction::Run(_) => f.write_str("Cleanup::Run"),
            CleanupAction::Unsubscribe(subscription) => {
                f.debug_tuple("Cleanup::Unsubscribe").field(subscription).finish()
            }
            CleanupAction::UnsubscribeWeak(weak) => match weak.upgrade() {
                Some(subscription) => f.debug_tuple("Cleanup::UnsubscribeWeak").field(&subscription).finish(),
                None => f.write_str("Cleanup::UnsubscribeWeak(gone)"),
            },
        }
    }
}

/// The channel a producer pushes notifications through.
///
/// Bound to exactly one subscription. Once that subscription is closed,
/// `next` and `complete` do nothing and `error` hands its value back.
pub struct SubscriptionObserver<T, E> {
    state: Rc<SubscriptionState<T, E>>,
}

impl<T, E> Clone for SubscriptionObserver<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T, E> SubscriptionObserver<T, E> {
    /// Whether the bound subscription is closed
    pub fn closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Identifier of the bound subscription
    pub fn subscription_id(&self) -> Uuid {
        self.state.id
    }

    /// Push a value. Never closes the subscription.
    ///
    /// A value pushed from inside the observer's own `next` callback is
    /// queued and delivered, in push order, as soon as the running call
    /// returns. The outermost push reports any failure from the queued
    /// deliveries; values still queued when the subscription closes are
    /// discarded.
    pub fn next(&self, value: T) -> Result<(), E> {
        let Some(observer) = self.state.current_observer() else {
            return Ok(());
        };
        if observer.next_running() {
            log::trace!("subscription {}: queued re-entrant next", self.state.id);
            self.state.backlog.borrow_mut().push_back(value);
            return Ok(());
        }
        log::trace!("subscription {}: next", self.state.id);
        observer.call_next(value)?;
        while let Some(value) = self.state.pop_backlog() {
            let Some(observer) = self.state.current_observer() else {
                break;
            };
            log::trace!("subscription {}: next from backlog", self.state.id);
            observer.call_next(value)?;
        }
        Ok(())
    }

    /// Terminate with an error.
    ///
    /// Returns `Err` when the observer's error callback fails, when it has
    /// no error callback, or when the subscription was already closed. In
    /// the last two cases the `Err` carries the original value back to the
    /// caller. Cleanup runs before returning either way.
    pub fn error(&self, error: E) -> Result<(), E> {
        let Some(observer) = self.state.take_observer() else {
            log::warn!(
                "subscription {}: error notification after close is uncaught",
                self.state.id
            );
            return Err(error);
        };
        log::debug!("subscription {}: closed with error", self.state.id);
        if !observer.has_error() {
            log::warn!(
                "subscription {}: observer has no error callback, error is uncaught",
                self.state.id
            );
        }
        let result = observer.call_error(error);
        self.state.run_cleanup();
        result
    }

    /// Terminate normally. A missing complete callback is not an error.
    pub fn complete(&self) -> Result<(), E> {
        let Some(observer) = self.state.take_observer() else {
            return Ok(());
        };
        log::debug!("subscription {}: completed", self.state.id);
        let result = observer.call_complete();
        self.state.run_cleanup();
        result
    }
}

impl<T, E> fmt::Debug for SubscriptionObserver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionObserver")
            .field("subscription", &self.state.id)
            .field("closed", &self.closed())
            .finish()
    }
}

/// Runs a producer against a freshly opened subscription.
pub(crate) fn open<T, E, P>(observer: Observer<T, E>, producer: &P) -> Result<Subscription, E>
where
    T: 'static,
    E: 'static,
    P: Fn(SubscriptionObserver<T, E>) -> Result<Option<Cleanup>, E> + ?Sized,
{
    let state = Rc::new(SubscriptionState {
        id: Uuid::new_v4(),
        observer: RefCell::new(Some(Rc::new(observer))),
        cleanup: RefCell::new(None),
        backlog: RefCell::new(VecDeque::new()),
    });
    let subscription = Subscription {
        state: state.clone(),
    };
    log::debug!("subscription {}: opened", state.id);

    if let Some(observer) = state.current_observer() {
        observer.call_start(&subscription)?;
    }
    if state.is_closed() {
        log::debug!("subscription {}: closed during start, producer skipped", state.id);
        return Ok(subscription);
    }

    let surface = SubscriptionObserver {
        state: state.clone(),
    };
    match producer(surface.clone()) {
        Ok(Some(cleanup)) => state.set_cleanup(cleanup),
        Ok(None) => {}
        Err(error) => {
            surface.error(error)?;
            return Ok(subscription);
        }
    }

    if state.is_closed() {
        state.run_cleanup();
    }
    Ok(subscription)
}
