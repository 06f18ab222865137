//! Property definition traits for synchronous and asynchronous testing.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use crate::error::PropertyError;

/// Property definition trait for synchronous testing
pub trait Property<T> {
    type Output;

    /// Test the property with the given input
    fn test(&self, input: T) -> Result<Self::Output, PropertyError>;
}

/// Async property trait for asynchronous testing
pub trait AsyncProperty<T> {
    type Output;

    /// Test the property asynchronously with the given input
    fn test(
        &self,
        input: T,
    ) -> impl Future<Output = Result<Self::Output, PropertyError>> + Send;
}

impl<T, P: Property<T> + ?Sized> Property<T> for &P {
    type Output = P::Output;

    fn test(&self, input: T) -> Result<Self::Output, PropertyError> {
        (**self).test(input)
    }
}

/// Trait for closures that can act as properties
///
/// Implemented for closures returning `bool`; `false` is a predicate failure.
pub trait PropertyClosure<T> {
    /// Call the property closure with the given input
    fn call(&self, input: T) -> Result<(), PropertyError>;
}

impl<F, T> PropertyClosure<T> for F
where
    F: Fn(T) -> bool,
{
    fn call(&self, input: T) -> Result<(), PropertyError> {
        if self(input) {
            Ok(())
        } else {
            Err(PropertyError::property_failed("Property returned false"))
        }
    }
}

/// Wrapper that converts a boolean closure into a `Property` implementation
#[derive(Debug, Clone, Copy)]
pub struct ClosureProperty<F> {
    closure: F,
}

impl<F> ClosureProperty<F> {
    pub fn new(closure: F) -> Self {
        Self { closure }
    }
}

impl<F, T> Property<T> for ClosureProperty<F>
where
    F: PropertyClosure<T>,
{
    type Output = ();

    fn test(&self, input: T) -> Result<(), PropertyError> {
        self.closure.call(input)
    }
}

/// Wrapper for closures that report failures through `Result`
#[derive(Debug, Clone, Copy)]
pub struct FallibleProperty<F> {
    closure: F,
}

impl<F, T, O> Property<T> for FallibleProperty<F>
where
    F: Fn(T) -> Result<O, PropertyError>,
{
    type Output = O;

    fn test(&self, input: T) -> Result<O, PropertyError> {
        (self.closure)(input)
    }
}

/// Wrapper for closures returning a future
#[derive(Debug, Clone, Copy)]
pub struct AsyncClosureProperty<F> {
    closure: F,
}

impl<F, T, O, Fut> AsyncProperty<T> for AsyncClosureProperty<F>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<O, PropertyError>> + Send,
{
    type Output = O;

    fn test(&self, input: T) -> impl Future<Output = Result<O, PropertyError>> + Send {
        (self.closure)(input)
    }
}

/// Property from a closure returning `bool`
pub fn property<F>(closure: F) -> ClosureProperty<F> {
    ClosureProperty::new(closure)
}

/// Property from a closure returning `Result`
pub fn fallible<F>(closure: F) -> FallibleProperty<F> {
    FallibleProperty { closure }
}

/// Async property from a closure returning a future of `Result`
pub fn async_property<F>(closure: F) -> AsyncClosureProperty<F> {
    AsyncClosureProperty { closure }
}

/// Discard the current input unless `condition` holds
///
/// ```rust
/// use proviso::{PropertyError, fallible, pre};
///
/// let halves = fallible(|x: i64| -> Result<(), PropertyError> {
///     pre(x % 2 == 0)?;
///     assert_eq!(x / 2 * 2, x);
///     Ok(())
/// });
/// # let _ = halves;
/// ```
pub fn pre(condition: bool) -> Result<(), PropertyError> {
    if condition {
        Ok(())
    } else {
        Err(PropertyError::precondition_failed("precondition not met"))
    }
}

/// Run a property exactly once, turning a panic into an ordinary failure
pub(crate) fn guarded_test<T, P>(property: &P, input: T) -> Result<P::Output, PropertyError>
where
    P: Property<T> + ?Sized,
{
    match catch_unwind(AssertUnwindSafe(|| property.test(input))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(PropertyError::from_panic(payload.as_ref())),
    }
}

/// Async counterpart of [`guarded_test`]
///
/// Panics raised while building the future and while polling it are both caught.
pub(crate) async fn guarded_test_async<T, P>(
    property: &P,
    input: T,
) -> Result<P::Output, PropertyError>
where
    P: AsyncProperty<T> + ?Sized,
{
    let future = match catch_unwind(AssertUnwindSafe(|| property.test(input))) {
        Ok(future) => future,
        Err(payload) => return Err(PropertyError::from_panic(payload.as_ref())),
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(PropertyError::from_panic(payload.as_ref())),
    }
}
