//! Bridge from push notifications to an async `futures` stream.
//!
//! The bridge subscribes immediately and buffers whatever the producer
//! pushes until the consumer polls for it. It never schedules work of its
//! own.

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures_core::Stream as AsyncStream;
use futures_util::StreamExt;

use crate::error::StreamError;
use crate::observer::Observer;
use crate::stream::Stream;
use crate::stream_configuration::BridgeConfig;
use crate::subscription::{Subscription, WeakSubscription};

/// An async stream fed by a subscription.
///
/// Yields `Ok` for every value and a final `Err` if the source errors, then
/// ends. Dropping the bridge unsubscribes from the source.
pub struct AsyncBridge<T, E> {
    receiver: mpsc::UnboundedReceiver<Result<T, E>>,
    buffered: Rc<Cell<usize>>,
    subscription: Option<Subscription>,
}

impl<T, E> AsyncBridge<T, E> {
    /// The subscription feeding this bridge, if subscribing succeeded
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }
}

impl<T, E> AsyncStream for AsyncBridge<T, E> {
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(item)) => {
                if item.is_ok() {
                    self.buffered.set(self.buffered.get().saturating_sub(1));
                }
                Poll::Ready(Some(item))
            }
            other => other,
        }
    }
}

impl<T, E> Drop for AsyncBridge<T, E> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

pub(crate) fn bridge<T, E>(source: &Stream<T, E>, config: BridgeConfig) -> AsyncBridge<T, E>
where
    T: 'static,
    E: From<StreamError> + 'static,
{
    let (sender, receiver) = mpsc::unbounded();
    let buffered = Rc::new(Cell::new(0usize));
    let slot: Rc<RefCell<Option<WeakSubscription>>> = Rc::new(RefCell::new(None));

    let start_slot = Rc::clone(&slot);
    let next_sender = sender.clone();
    let next_buffered = Rc::clone(&buffered);
    let error_sender = sender.clone();
    let capacity = config.capacity;

    let subscribed = source.open(
        Observer::new()
            .start(move |subscription| {
                *start_slot.borrow_mut() = Some(subscription.downgrade());
                Ok(())
            })
            .next(move |value| {
                if capacity.is_some_and(|capacity| next_buffered.get() >= capacity) {
                    log::warn!("async bridge buffer full, failing subscription");
                    let _ = next_sender.unbounded_send(Err(StreamError::BufferOverflow.into()));
                    next_sender.close_channel();
                    let subscription = slot.borrow().as_ref().and_then(WeakSubscription::upgrade);
                    if let Some(subscription) = subscription {
                        subscription.unsubscribe();
                    }
                    return Ok(());
                }
                if next_sender.unbounded_send(Ok(value)).is_ok() {
                    next_buffered.set(next_buffered.get() + 1);
                }
                Ok(())
            })
            .error(move |error| {
                let _ = error_sender.unbounded_send(Err(error));
                error_sender.close_channel();
                Ok(())
            })
            .complete({
                let sender = sender.clone();
                move || {
                    sender.close_channel();
                    Ok(())
                }
            }),
    );

    let subscription = match subscribed {
        Ok(subscription) => Some(subscription),
        Err(error) => {
            let _ = sender.unbounded_send(Err(error));
            sender.close_channel();
            None
        }
    };

    AsyncBridge {
        receiver,
        buffered,
        subscription,
    }
}
