//! rs2-observe - push-based observable streams
//!
//! A [`Stream`] wraps a producer function. Subscribing runs the producer
//! against a fresh [`SubscriptionObserver`], through which it pushes values,
//! an error, or completion to the [`Observer`]. Everything runs
//! synchronously on the caller's thread; asynchrony, if any, belongs to the
//! producer.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use rs2_observe::{of, Observable, Stream};
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//!
//! let evens: Stream<i32> = of![1, 2, 3, 4].filter(|x| Ok(*x % 2 == 0));
//! evens
//!     .subscribe_next(move |x| {
//!         sink.borrow_mut().push(x);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(*seen.borrow(), vec![2, 4]);
//! ```

pub mod bridge;
pub mod error;
pub mod observer;
pub mod stream;
pub mod stream_configuration;
pub mod subscription;

pub use bridge::AsyncBridge;
pub use error::{StreamError, StreamResult};
pub use observer::Observer;
pub use stream::{
    from, from_iter, from_json, from_json_str, of, ForEach, IntoStream, Observable, Stream,
};
pub use stream_configuration::BridgeConfig;
pub use subscription::{Cleanup, Subscription, SubscriptionObserver};
