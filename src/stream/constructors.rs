//! Stream constructors: of, from, from_iter, from_json
use serde_json::Value;

use super::core::Stream;
use crate::error::{StreamError, StreamResult};
use crate::subscription::{Cleanup, SubscriptionObserver};

/// Conversion into a [`Stream`].
///
/// A `Stream` converts into itself, so converting a stream that is already
/// of the target type returns the same instance. Every cloneable iterable
/// converts by draining a fresh iterator per subscription.
pub trait IntoStream<T, E> {
    fn into_stream(self) -> Stream<T, E>;
}

impl<T: 'static, E: 'static> IntoStream<T, E> for Stream<T, E> {
    fn into_stream(self) -> Stream<T, E> {
        self
    }
}

impl<I, E> IntoStream<I::Item, E> for I
where
    I: IntoIterator + Clone + 'static,
    I::Item: 'static,
    E: 'static,
{
    fn into_stream(self) -> Stream<I::Item, E> {
        from_iter(self)
    }
}

/// Push every item, stopping early once the subscription closes
fn drain<T, E, I>(observer: &SubscriptionObserver<T, E>, items: I) -> Result<Option<Cleanup>, E>
where
    I: IntoIterator<Item = T>,
{
    for item in items {
        observer.next(item)?;
        if observer.closed() {
            return Ok(None);
        }
    }
    observer.complete()?;
    Ok(None)
}

/// Emit the given values in order, then complete
pub fn of<T, E, I>(values: I) -> Stream<T, E>
where
    T: Clone + 'static,
    E: 'static,
    I: IntoIterator<Item = T>,
{
    let items: Vec<T> = values.into_iter().collect();
    Stream::new(move |observer| drain(&observer, items.iter().cloned()))
}

/// Convert anything stream-like into a stream
pub fn from<S, T, E>(source: S) -> Stream<T, E>
where
    S: IntoStream<T, E>,
{
    source.into_stream()
}

/// Emit every item of an iterable, re-iterating it for each subscription
pub fn from_iter<I, E>(iterable: I) -> Stream<I::Item, E>
where
    I: IntoIterator + Clone + 'static,
    I::Item: 'static,
    E: 'static,
{
    Stream::new(move |observer| drain(&observer, iterable.clone()))
}

/// Convert a dynamic JSON value into a stream.
///
/// Arrays emit their elements and strings emit their characters. `null` is
/// rejected as an invalid argument and every other value as not observable.
pub fn from_json<E: 'static>(value: Value) -> StreamResult<Stream<Value, E>> {
    match value {
        Value::Null => Err(StreamError::InvalidArgument("null is not an object".to_string())),
        Value::Array(items) => Ok(from_iter(items)),
        Value::String(text) => {
            let chars: Vec<Value> = text.chars().map(|c| Value::String(c.to_string())).collect();
            Ok(from_iter(chars))
        }
        other => Err(StreamError::NotObservable(other.to_string())),
    }
}

/// Parse `json` and convert the result with [`from_json`]
pub fn from_json_str<E: 'static>(json: &str) -> StreamResult<Stream<Value, E>> {
    let value: Value = serde_json::from_str(json)?;
    from_json(value)
}

/// Build a stream from a list of values.
///
/// ```
/// use rs2_observe::{of, Stream};
///
/// let numbers: Stream<i32> = of![1, 2, 3];
/// ```
#[macro_export]
macro_rules! of {
    ($($value:expr),* $(,)?) => {
        $crate::stream::of(::std::vec![$($value),*])
    };
}
