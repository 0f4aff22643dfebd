use super::form::{from_values, Form};
use super::values::ValuePool;
use crate::error::{BindError, FormError};
use serde::de::DeserializeOwned;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type ErasedValue = Arc<dyn Any + Send + Sync>;
type Projection = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<Box<dyn Any>> + Send + Sync>;

/// Declared type of one handler parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub type_name: &'static str,
    pub type_id: TypeId,
}

impl ParamType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

#[derive(Clone)]
struct Capability {
    type_id: TypeId,
    type_name: &'static str,
    project: Projection,
}

/// One framework- or application-provided value.
///
/// The value is stored once behind an `Arc`. A parameter declared as `T`
/// receives a clone, one declared as `Arc<T>` shares the allocation, and one
/// declared as `Box<C>` for a registered capability `C` receives a projection.
#[derive(Clone)]
pub struct SuppliedParam {
    type_id: TypeId,
    type_name: &'static str,
    shared_id: TypeId,
    value: ErasedValue,
    clone_fn: fn(&(dyn Any + Send + Sync)) -> Option<Box<dyn Any>>,
    share_fn: fn(&ErasedValue) -> Option<Box<dyn Any>>,
    capabilities: Vec<Capability>,
}

fn clone_erased<T: Clone + 'static>(value: &(dyn Any + Send + Sync)) -> Option<Box<dyn Any>> {
    value
        .downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as Box<dyn Any>)
}

fn share_erased<T: Send + Sync + 'static>(value: &ErasedValue) -> Option<Box<dyn Any>> {
    Arc::clone(value)
        .downcast::<T>()
        .ok()
        .map(|v| Box::new(v) as Box<dyn Any>)
}

impl SuppliedParam {
    pub fn new<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    pub fn shared<T: Clone + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            shared_id: TypeId::of::<Arc<T>>(),
            value,
            clone_fn: clone_erased::<T>,
            share_fn: share_erased::<T>,
            capabilities: Vec::new(),
        }
    }

    /// Offer the value to parameters declared as `Box<C>`.
    ///
    /// ```rust,ignore
    /// SuppliedParam::new(writer)
    ///     .with_capability(|w: &ResponseWriter| -> Box<dyn io::Write + Send> { Box::new(w.clone()) })
    /// ```
    #[must_use]
    pub fn with_capability<T, C, F>(mut self, project: F) -> Self
    where
        T: 'static,
        C: ?Sized + 'static,
        F: Fn(&T) -> Box<C> + Send + Sync + 'static,
    {
        if TypeId::of::<T>() != self.type_id {
            trace!(
                capability = type_name::<C>(),
                value = self.type_name,
                "Capability projection does not match the supplied type, ignored"
            );
            return self;
        }
        self.capabilities.push(Capability {
            type_id: TypeId::of::<Box<C>>(),
            type_name: type_name::<C>(),
            project: Arc::new(move |any: &(dyn Any + Send + Sync)| {
                any.downcast_ref::<T>()
                    .map(|v| Box::new(project(v)) as Box<dyn Any>)
            }),
        });
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for SuppliedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppliedParam")
            .field("type", &self.type_name)
            .field(
                "capabilities",
                &self
                    .capabilities
                    .iter()
                    .map(|c| c.type_name)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The pool of pre-built values a handler parameter can be bound from.
#[derive(Debug, Default)]
pub struct SuppliedParams {
    params: Vec<SuppliedParam>,
}

impl SuppliedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: SuppliedParam) -> &mut Self {
        self.params.push(param);
        self
    }

    pub fn add<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.push(SuppliedParam::new(value))
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = SuppliedParam>) -> &mut Self {
        self.params.extend(other);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Resolve a declared type against the pool.
    ///
    /// Tiers are tried in order over the whole pool: exact type, shared
    /// (`Arc<T>` of a supplied `T`), then capability (`Box<C>`).
    pub fn resolve<P: 'static>(&self) -> Option<P> {
        let want = TypeId::of::<P>();

        let erased = self
            .params
            .iter()
            .find(|p| p.type_id == want)
            .and_then(|p| {
                trace!(param = type_name::<P>(), "Bound by exact type");
                (p.clone_fn)(p.value.as_ref())
            })
            .or_else(|| {
                self.params.iter().find(|p| p.shared_id == want).and_then(|p| {
                    trace!(param = type_name::<P>(), "Bound by shared reference");
                    (p.share_fn)(&p.value)
                })
            })
            .or_else(|| {
                self.params.iter().find_map(|p| {
                    let cap = p.capabilities.iter().find(|c| c.type_id == want)?;
                    trace!(
                        param = type_name::<P>(),
                        supplied = p.type_name,
                        "Bound by capability"
                    );
                    (cap.project)(p.value.as_ref())
                })
            })?;

        erased.downcast::<P>().ok().map(|boxed| *boxed)
    }
}

/// Per-invocation view of the supplied values and the value pool.
pub struct ParamBinder<'a> {
    supplied: &'a SuppliedParams,
    values: &'a ValuePool,
}

impl<'a> ParamBinder<'a> {
    pub fn new(supplied: &'a SuppliedParams, values: &'a ValuePool) -> Self {
        Self { supplied, values }
    }

    pub fn supplied<P: 'static>(&self) -> Option<P> {
        self.supplied.resolve::<P>()
    }

    /// Require a supplied value, failing with [`BindError::NotSupplied`].
    pub fn require<P: 'static>(&self) -> Result<P, BindError> {
        self.supplied().ok_or(BindError::NotSupplied {
            type_name: type_name::<P>(),
        })
    }

    /// Construct a `T` from the value pool.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FormError> {
        trace!(param = type_name::<T>(), "Decoding from values");
        from_values(self.values)
    }

    #[must_use]
    pub fn values(&self) -> &'a ValuePool {
        self.values
    }
}

/// A type that can appear as a handler parameter.
pub trait ActionParam: Sized + 'static {
    fn param_type() -> ParamType {
        ParamType::of::<Self>()
    }

    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError>;
}

/// An application value registered with `MvcBuilder::provide`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Supplied<T>(pub T);

impl<T: 'static> ActionParam for Supplied<T> {
    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError> {
        binder.require::<T>().map(Supplied)
    }
}

impl<T: Send + Sync + 'static> ActionParam for Arc<T> {
    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError> {
        binder.require()
    }
}

impl<C: ?Sized + 'static> ActionParam for Box<C> {
    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError> {
        binder.require()
    }
}

impl<T: ActionParam> ActionParam for Option<T> {
    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError> {
        Ok(T::from_binder(binder).ok())
    }
}

impl<T: DeserializeOwned + 'static> ActionParam for Form<T> {
    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError> {
        if let Some(form) = binder.supplied::<Self>() {
            return Ok(form);
        }
        binder
            .decode::<T>()
            .map(Form)
            .map_err(|source| BindError::Decode {
                type_name: type_name::<T>(),
                source,
            })
    }
}

impl ActionParam for ValuePool {
    fn from_binder(binder: &ParamBinder<'_>) -> Result<Self, BindError> {
        Ok(binder.values().clone())
    }
}

/// Implement [`ActionParam`] for types that are always bound from the pool.
#[macro_export]
macro_rules! supplied_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::params::ActionParam for $ty {
                fn from_binder(
                    binder: &$crate::params::ParamBinder<'_>,
                ) -> ::std::result::Result<Self, $crate::error::BindError> {
                    binder.require()
                }
            }
        )*
    };
}
