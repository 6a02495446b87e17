//! Command handlers.
//!
//! A handler is a plain function taking the [`Invocation`] followed by up to
//! twelve bound parameters, or a method taking an instance first. The
//! parameter list of a command is read off the handler's signature: each
//! argument type implements [`FromBinding`], which both describes the
//! parameter ([`ParamSpec`]) and extracts it from the bound values.
//!
//! ```rust,ignore
//! fn ban(inv: &Invocation<'_>, target: Arg<Member>, days: Option<Arg<i32>>) -> String {
//!     format!("banned {} for {} days", target.display_name(), days.map_or(1, |d| *d))
//! }
//!
//! struct Counter(AtomicUsize);
//!
//! impl Counter {
//!     fn bump(&self, _inv: &Invocation<'_>) -> String {
//!         format!("{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
//!     }
//! }
//! ```
//!
//! Return values go through [`IntoReply`]: text becomes a reply, `()` sends
//! nothing, and the error of a `Result` is reported as a handler failure.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use bronze_core::ValueStream;

use crate::binder::BoundValue;
use crate::error::{BoxError, CommandError, CommandResult, panic_message};
use crate::event::Reply;
use crate::invocation::Invocation;
use crate::parameter::{Collection, ParamSpec};

// ============================================================================
// Parameter wrappers
// ============================================================================

/// A required single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arg<T>(pub T);

impl<T> Arg<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Arg<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Arg<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// Every matching value, collected eagerly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args<T>(pub Vec<T>);

impl<T> Args<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Args<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> IntoIterator for Args<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Every matching value, as an iterator.
pub struct ArgStream<T>(ValueStream<T>);

impl<T> Iterator for ArgStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.next()
    }
}

impl<T> fmt::Debug for ArgStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgStream").finish_non_exhaustive()
    }
}

/// A handler argument type.
pub trait FromBinding: Sized + Send + 'static {
    /// How the parameter is declared.
    fn spec() -> ParamSpec;

    /// Rebuilds the argument from its bound value.
    fn from_bound(value: BoundValue) -> Option<Self>;
}

impl<T: Send + 'static> FromBinding for Arg<T> {
    fn spec() -> ParamSpec {
        ParamSpec::of::<T>(Collection::Single, false, true)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        value?.downcast::<T>().ok().map(|v| Arg(*v))
    }
}

impl<T: Send + 'static> FromBinding for Option<Arg<T>> {
    fn spec() -> ParamSpec {
        ParamSpec::of::<T>(Collection::Single, true, false)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            None => Some(None),
            Some(value) => value.downcast::<T>().ok().map(|v| Some(Arg(*v))),
        }
    }
}

impl<T: Send + 'static> FromBinding for Args<T> {
    fn spec() -> ParamSpec {
        ParamSpec::of::<T>(Collection::List, true, true)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        value?.downcast::<Vec<T>>().ok().map(|v| Args(*v))
    }
}

impl<T: Send + 'static> FromBinding for ArgStream<T> {
    fn spec() -> ParamSpec {
        ParamSpec::of::<T>(Collection::Stream, true, true)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        value?
            .downcast::<ValueStream<T>>()
            .ok()
            .map(|v| ArgStream(*v))
    }
}

// ============================================================================
// IntoReply - handler return values
// ============================================================================

/// Turns a handler's return value into an optional reply.
pub trait IntoReply {
    fn into_reply(self) -> CommandResult<Option<Reply>>;
}

impl IntoReply for () {
    fn into_reply(self) -> CommandResult<Option<Reply>> {
        Ok(None)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> CommandResult<Option<Reply>> {
        Ok(Some(Reply::Text(self)))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> CommandResult<Option<Reply>> {
        Ok(Some(Reply::text(self)))
    }
}

impl IntoReply for Reply {
    fn into_reply(self) -> CommandResult<Option<Reply>> {
        Ok(Some(self))
    }
}

/// `None` sends nothing.
impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> CommandResult<Option<Reply>> {
        match self {
            Some(inner) => inner.into_reply(),
            None => Ok(None),
        }
    }
}

/// `Err` is reported as [`CommandError::Handler`].
impl<T: IntoReply, E: fmt::Display> IntoReply for Result<T, E> {
    fn into_reply(self) -> CommandResult<Option<Reply>> {
        match self {
            Ok(inner) => inner.into_reply(),
            Err(e) => Err(CommandError::Handler(e.to_string())),
        }
    }
}

// ============================================================================
// Handler and Method traits
// ============================================================================

/// A free function usable as a command handler.
///
/// Implemented for every `Fn(&Invocation, T1, .., Tn) -> R` with up to
/// twelve [`FromBinding`] parameters and an [`IntoReply`] return type.
pub trait Handler<A>: Send + Sync + 'static {
    fn parameters() -> Vec<ParamSpec>;

    fn call(&self, inv: &Invocation<'_>, values: Vec<BoundValue>)
    -> CommandResult<Option<Reply>>;
}

/// A method usable as a command handler; the instance comes from the
/// command's instance source.
pub trait Method<C, A>: Send + Sync + 'static {
    fn parameters() -> Vec<ParamSpec>;

    fn call(
        &self,
        instance: &C,
        inv: &Invocation<'_>,
        values: Vec<BoundValue>,
    ) -> CommandResult<Option<Reply>>;
}

fn extract<T: FromBinding>(
    values: &mut std::vec::IntoIter<BoundValue>,
    index: usize,
) -> CommandResult<T> {
    T::from_bound(values.next().flatten()).ok_or(CommandError::Extraction {
        index,
        type_name: std::any::type_name::<T>(),
    })
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn(&Invocation<'_>, $($ty,)*) -> R + Send + Sync + 'static,
            R: IntoReply,
            $( $ty: FromBinding, )*
        {
            fn parameters() -> Vec<ParamSpec> {
                vec![$($ty::spec(),)*]
            }

            fn call(
                &self,
                inv: &Invocation<'_>,
                values: Vec<BoundValue>,
            ) -> CommandResult<Option<Reply>> {
                let mut values = values.into_iter();
                let mut index = 0;
                $(
                    let $ty = extract::<$ty>(&mut values, index)?;
                    index += 1;
                )*
                (self)(inv, $($ty,)*).into_reply()
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<C, F, R, $($ty,)*> Method<C, ($($ty,)*)> for F
        where
            C: Send + Sync + 'static,
            F: Fn(&C, &Invocation<'_>, $($ty,)*) -> R + Send + Sync + 'static,
            R: IntoReply,
            $( $ty: FromBinding, )*
        {
            fn parameters() -> Vec<ParamSpec> {
                vec![$($ty::spec(),)*]
            }

            fn call(
                &self,
                instance: &C,
                inv: &Invocation<'_>,
                values: Vec<BoundValue>,
            ) -> CommandResult<Option<Reply>> {
                let mut values = values.into_iter();
                let mut index = 0;
                $(
                    let $ty = extract::<$ty>(&mut values, index)?;
                    index += 1;
                )*
                (self)(instance, inv, $($ty,)*).into_reply()
            }
        }
    };
}

// Generate implementations for 0-12 parameters
impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// ============================================================================
// Instance sources and invokers
// ============================================================================

/// A type-erased, ready-to-call command body.
pub type Invoker =
    Arc<dyn Fn(&Invocation<'_>, Vec<BoundValue>) -> CommandResult<Option<Reply>> + Send + Sync>;

/// Wraps a closure as an [`Invoker`], fixing its signature.
pub fn invoker<F>(f: F) -> Invoker
where
    F: Fn(&Invocation<'_>, Vec<BoundValue>) -> CommandResult<Option<Reply>> + Send + Sync + 'static,
{
    Arc::new(f)
}

type Supplier<C> = Arc<dyn Fn() -> Result<C, BoxError> + Send + Sync>;

/// Where a method handler gets its instance from.
pub enum InstanceSource<C> {
    /// One instance shared by every invocation.
    Shared(Arc<C>),
    /// A fresh instance per invocation, unless the command is persistent.
    Supplier(Supplier<C>),
}

impl<C: Send + Sync + 'static> InstanceSource<C> {
    pub fn shared(instance: Arc<C>) -> Self {
        Self::Shared(instance)
    }

    pub fn supplier<F, E>(supplier: F) -> Self
    where
        F: Fn() -> Result<C, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::Supplier(Arc::new(move || supplier().map_err(Into::into)))
    }

    /// Instances built with `C::default()`.
    pub fn class() -> Self
    where
        C: Default,
    {
        Self::Supplier(Arc::new(|| Ok(C::default())))
    }
}

impl<C> fmt::Debug for InstanceSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(_) => f.write_str("InstanceSource::Shared"),
            Self::Supplier(_) => f.write_str("InstanceSource::Supplier"),
        }
    }
}

enum Instances<C> {
    Shared(Arc<C>),
    Fresh(Supplier<C>),
    Persistent {
        supplier: Supplier<C>,
        cell: Mutex<Option<Arc<C>>>,
    },
}

impl<C> Instances<C> {
    fn new(source: InstanceSource<C>, persistent: bool) -> Self {
        match source {
            InstanceSource::Shared(instance) => Self::Shared(instance),
            InstanceSource::Supplier(supplier) if persistent => Self::Persistent {
                supplier,
                cell: Mutex::new(None),
            },
            InstanceSource::Supplier(supplier) => Self::Fresh(supplier),
        }
    }

    fn get(&self) -> CommandResult<Arc<C>> {
        match self {
            Self::Shared(instance) => Ok(Arc::clone(instance)),
            Self::Fresh(supplier) => construct(supplier).map(Arc::new),
            Self::Persistent { supplier, cell } => {
                let mut cell = cell.lock();
                if let Some(instance) = cell.as_ref() {
                    return Ok(Arc::clone(instance));
                }
                // A failed construction leaves the cell empty; the next
                // invocation tries again.
                let instance = Arc::new(construct(supplier)?);
                *cell = Some(Arc::clone(&instance));
                Ok(instance)
            }
        }
    }
}

fn construct<C>(supplier: &Supplier<C>) -> CommandResult<C> {
    match catch_unwind(AssertUnwindSafe(|| supplier())) {
        Ok(Ok(instance)) => Ok(instance),
        Ok(Err(e)) => Err(CommandError::Construction(e.to_string())),
        Err(payload) => Err(CommandError::Construction(panic_message(payload.as_ref()))),
    }
}

/// A handler waiting to be turned into an [`Invoker`] at build time.
pub(crate) trait HandlerSlot: Send {
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Fails with the expected instance type name when `source` is missing
    /// or of the wrong type.
    fn into_invoker(
        self: Box<Self>,
        source: Option<Box<dyn Any + Send>>,
        persistent: bool,
    ) -> Result<Invoker, &'static str>;
}

pub(crate) struct FunctionSlot<H, A> {
    handler: H,
    _marker: PhantomData<fn() -> A>,
}

impl<H, A> FunctionSlot<H, A> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<H, A> HandlerSlot for FunctionSlot<H, A>
where
    H: Handler<A>,
    A: 'static,
{
    fn parameters(&self) -> Vec<ParamSpec> {
        H::parameters()
    }

    fn into_invoker(
        self: Box<Self>,
        _source: Option<Box<dyn Any + Send>>,
        _persistent: bool,
    ) -> Result<Invoker, &'static str> {
        let handler = self.handler;
        Ok(invoker(move |inv, values| handler.call(inv, values)))
    }
}

pub(crate) struct MethodSlot<C, M, A> {
    method: M,
    _marker: PhantomData<fn() -> (C, A)>,
}

impl<C, M, A> MethodSlot<C, M, A> {
    pub(crate) fn new(method: M) -> Self {
        Self {
            method,
            _marker: PhantomData,
        }
    }
}

impl<C, M, A> HandlerSlot for MethodSlot<C, M, A>
where
    C: Send + Sync + 'static,
    M: Method<C, A>,
    A: 'static,
{
    fn parameters(&self) -> Vec<ParamSpec> {
        M::parameters()
    }

    fn into_invoker(
        self: Box<Self>,
        source: Option<Box<dyn Any + Send>>,
        persistent: bool,
    ) -> Result<Invoker, &'static str> {
        let instance_type = std::any::type_name::<C>();
        let source = source
            .and_then(|source| source.downcast::<InstanceSource<C>>().ok())
            .ok_or(instance_type)?;
        let instances = Instances::new(*source, persistent);
        let method = self.method;
        Ok(invoker(move |inv, values| {
            let instance = instances.get()?;
            method.call(&instance, inv, values)
        }))
    }
}
