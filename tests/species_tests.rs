use rs2_observe::{from, of, IntoStream, Observable, Observer, Stream, StreamError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

thread_local! {
    static DERIVED: Cell<usize> = const { Cell::new(0) };
}

/// A stream type that keeps its own type across operators
#[derive(Clone)]
struct Tagged<T> {
    stream: Stream<T>,
}

impl<T: 'static> Observable<T, StreamError> for Tagged<T> {
    type Species<U: 'static> = Tagged<U>;

    fn as_stream(&self) -> &Stream<T> {
        &self.stream
    }

    fn species<U: 'static>(stream: Stream<U>) -> Tagged<U> {
        DERIVED.with(|count| count.set(count.get() + 1));
        Tagged { stream }
    }
}

impl<T: 'static> IntoStream<T, StreamError> for Tagged<T> {
    fn into_stream(self) -> Stream<T> {
        self.stream
    }
}

/// A wrapper that derives plain streams
struct Plain<T> {
    stream: Stream<T>,
}

impl<T: 'static> Observable<T, StreamError> for Plain<T> {
    type Species<U: 'static> = Stream<U>;

    fn as_stream(&self) -> &Stream<T> {
        &self.stream
    }

    fn species<U: 'static>(stream: Stream<U>) -> Stream<U> {
        stream
    }
}

fn values<T: 'static, S: Observable<T, StreamError>>(source: &S) -> Vec<T> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    source
        .subscribe(Observer::new().next(move |value| {
            sink.borrow_mut().push(value);
            Ok(())
        }))
        .unwrap();
    let collected = seen.take();
    collected
}

#[test]
fn test_operators_preserve_species() {
    DERIVED.with(|count| count.set(0));
    let tagged = Tagged { stream: of![1, 2, 3, 4] };

    let derived: Tagged<String> = tagged
        .filter(|x| Ok(*x > 1))
        .map(|x| Ok(x * 10))
        .map(|x| Ok(x.to_string()));

    assert_eq!(DERIVED.with(Cell::get), 3);
    assert_eq!(values(&derived), vec!["20", "30", "40"]);
}

#[test]
fn test_fold_and_flatten_preserve_species() {
    let tagged = Tagged { stream: of![vec![1, 2], vec![3]] };

    let flat: Tagged<i32> = tagged.flatten();
    let total: Tagged<i32> = flat.fold(0, |acc, x| Ok(acc + x));

    assert_eq!(values(&total), vec![6]);
}

#[test]
fn test_species_can_degrade_to_plain_stream() {
    let plain = Plain { stream: of![1, 2] };
    let derived: Stream<i32> = plain.map(|x| Ok(x + 1));
    assert_eq!(values(&derived), vec![2, 3]);
}

#[test]
fn test_from_unwraps_convertible_types() {
    let stream: Stream<i32> = of![9];
    let tagged = Tagged { stream: stream.clone() };
    let converted = from(tagged);
    assert!(converted.ptr_eq(&stream));
}

#[test]
fn test_flatten_accepts_other_convertible_types() {
    let inner = Tagged { stream: of![1, 2] };
    let outer: Stream<Tagged<i32>> = of![inner.clone(), inner];
    let merged: Stream<i32> = outer.flatten();
    assert_eq!(values(&merged), vec![1, 2, 1, 2]);
}

#[test]
fn test_constructors_build_the_receiver_species() {
    let tagged: Tagged<i32> = Tagged::<i32>::of(vec![1, 2, 3]);
    assert_eq!(values(&tagged), vec![1, 2, 3]);

    let converted: Tagged<char> = Tagged::<char>::from_source(vec!['a', 'b']);
    assert_eq!(values(&converted), vec!['a', 'b']);

    let plain: Stream<i32> = Plain::<i32>::of(vec![7]);
    assert_eq!(values(&plain), vec![7]);
}

#[test]
fn test_from_source_keeps_the_wrapped_stream() {
    let stream: Stream<i32> = of![4, 5];
    let tagged = Tagged::<i32>::from_source(stream.clone());
    assert!(tagged.stream.ptr_eq(&stream));

    let rewrapped = Tagged::<i32>::from_source(tagged.clone());
    assert!(rewrapped.stream.ptr_eq(&stream));
}
