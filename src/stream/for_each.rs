//! The deferred result of `for_each`.
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use super::core::Stream;
use crate::error::StreamError;
use crate::observer::Observer;
use crate::subscription::WeakSubscription;

/// Future that settles when a `for_each` subscription terminates.
///
/// Resolves to `Ok(())` on completion and to the error on failure. If the
/// producer lets go of the subscription without terminating it, resolves
/// to [`StreamError::Cancelled`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ForEach<E> {
    receiver: oneshot::Receiver<Result<(), E>>,
}

impl<E> fmt::Debug for ForEach<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEach").finish_non_exhaustive()
    }
}

impl<E> Future for ForEach<E>
where
    E: From<StreamError>,
{
    type Output = Result<(), E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(StreamError::Cancelled.into())),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Settles the future at most once
struct Settle<E> {
    sender: RefCell<Option<oneshot::Sender<Result<(), E>>>>,
}

impl<E> Settle<E> {
    fn settle(&self, result: Result<(), E>) {
        let sender = self.sender.borrow_mut().take();
        if let Some(sender) = sender {
            // The receiver may already be gone; nobody is waiting then.
            let _ = sender.send(result);
        }
    }
}

pub(crate) fn for_each<T, E, F>(source: &Stream<T, E>, mut f: F) -> ForEach<E>
where
    T: 'static,
    E: 'static,
    F: FnMut(T) -> Result<(), E> + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let settle = Rc::new(Settle {
        sender: RefCell::new(Some(sender)),
    });
    let slot: Rc<RefCell<Option<WeakSubscription>>> = Rc::new(RefCell::new(None));

    let start_slot = Rc::clone(&slot);
    let next_settle = Rc::clone(&settle);
    let error_settle = Rc::clone(&settle);
    let complete_settle = Rc::clone(&settle);

    let subscribed = source.open(
        Observer::new()
            .start(move |subscription| {
                *start_slot.borrow_mut() = Some(subscription.downgrade());
                Ok(())
            })
            .next(move |value| {
                let subscription = slot.borrow().as_ref().and_then(WeakSubscription::upgrade);
                if subscription.as_ref().is_some_and(|s| s.closed()) {
                    return Ok(());
                }
                if let Err(error) = f(value) {
                    next_settle.settle(Err(error));
                    if let Some(subscription) = subscription {
                        subscription.unsubscribe();
                    }
                }
                Ok(())
            })
            .error(move |error| {
                error_settle.settle(Err(error));
                Ok(())
            })
            .complete(move || {
                complete_settle.settle(Ok(()));
                Ok(())
            }),
    );
    if let Err(error) = subscribed {
        settle.settle(Err(error));
    }

    ForEach { receiver }
}
