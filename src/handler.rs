//! Method descriptors: a handler's declared parameter types plus a
//! type-erased invocation closure, built once at bind time.

use crate::error::BindError;
use crate::params::{ActionParam, ParamBinder, ParamType};
use crate::result::ActionResult;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Conversion of a handler's return value into an optional result.
///
/// `None` means the handler already wrote the response itself.
pub trait IntoActionResult {
    fn into_action_result(self) -> Option<ActionResult>;
}

impl IntoActionResult for ActionResult {
    fn into_action_result(self) -> Option<ActionResult> {
        Some(self)
    }
}

impl IntoActionResult for () {
    fn into_action_result(self) -> Option<ActionResult> {
        None
    }
}

impl IntoActionResult for Option<ActionResult> {
    fn into_action_result(self) -> Option<ActionResult> {
        self
    }
}

impl<T: IntoActionResult, E: fmt::Display> IntoActionResult for Result<T, E> {
    fn into_action_result(self) -> Option<ActionResult> {
        match self {
            Ok(v) => v.into_action_result(),
            Err(e) => Some(ActionResult::error(e)),
        }
    }
}

/// A callable that can serve as an action of controller `C`.
///
/// Implemented for every `Fn(&mut C, T1, .., Tn) -> R` with `n <= 8`, where
/// each `Ti` is an [`ActionParam`] and `R` is an [`IntoActionResult`].
pub trait ActionHandler<C, Args>: Send + Sync + 'static {
    type Output: IntoActionResult;

    /// Declared parameter types, the receiver first.
    fn param_types() -> Vec<ParamType>;

    fn call(&self, controller: &mut C, binder: &ParamBinder<'_>) -> Result<Self::Output, BindError>;
}

macro_rules! impl_action_handler {
    ($($ty:ident),*) => {
        impl<C, F, R, $($ty,)*> ActionHandler<C, ($($ty,)*)> for F
        where
            C: 'static,
            F: Fn(&mut C, $($ty,)*) -> R + Send + Sync + 'static,
            R: IntoActionResult,
            $($ty: ActionParam,)*
        {
            type Output = R;

            fn param_types() -> Vec<ParamType> {
                vec![ParamType::of::<C>(), $($ty::param_type(),)*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, controller: &mut C, binder: &ParamBinder<'_>) -> Result<R, BindError> {
                $(let $ty = $ty::from_binder(binder)?;)*
                Ok((self)(controller, $($ty,)*))
            }
        }
    };
}

impl_action_handler!();
impl_action_handler!(T1);
impl_action_handler!(T1, T2);
impl_action_handler!(T1, T2, T3);
impl_action_handler!(T1, T2, T3, T4);
impl_action_handler!(T1, T2, T3, T4, T5);
impl_action_handler!(T1, T2, T3, T4, T5, T6);
impl_action_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_action_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

type Invoke =
    Arc<dyn Fn(&mut dyn Any, &ParamBinder<'_>) -> Result<Option<ActionResult>, BindError> + Send + Sync>;

/// Immutable record of one bound handler.
#[derive(Clone)]
pub struct MethodDescriptor {
    handler: &'static str,
    param_types: Vec<ParamType>,
    invoke: Invoke,
}

impl MethodDescriptor {
    pub fn new<C, Args, H>(handler: H) -> Self
    where
        C: 'static,
        H: ActionHandler<C, Args>,
    {
        Self {
            handler: type_name::<H>(),
            param_types: H::param_types(),
            invoke: Arc::new(move |controller: &mut dyn Any, binder: &ParamBinder<'_>| {
                let controller = controller.downcast_mut::<C>().ok_or(BindError::ControllerMismatch {
                    expected: type_name::<C>(),
                })?;
                handler
                    .call(controller, binder)
                    .map(IntoActionResult::into_action_result)
            }),
        }
    }

    /// Declared parameter types in positional order, the receiver first.
    #[must_use]
    pub fn param_types(&self) -> &[ParamType] {
        &self.param_types
    }

    #[must_use]
    pub fn handler_name(&self) -> &'static str {
        self.handler
    }

    /// Resolve every declared parameter and call the handler.
    pub fn invoke(
        &self,
        controller: &mut dyn Any,
        binder: &ParamBinder<'_>,
    ) -> Result<Option<ActionResult>, BindError> {
        (self.invoke)(controller, binder)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("handler", &self.handler)
            .field("param_types", &self.param_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Action, Controller};
    use crate::params::{Form, SuppliedParams, ValuePool};

    #[derive(Default)]
    struct Counter {
        calls: u32,
    }

    #[derive(serde::Deserialize)]
    struct Input {
        #[serde(rename = "Name")]
        name: String,
    }

    fn pools() -> (SuppliedParams, ValuePool) {
        let mut supplied = SuppliedParams::new();
        supplied.add(Controller::new("Home")).add(Action::new("Index"));
        let values: ValuePool = [("Name", "O'Hara")].into_iter().collect();
        (supplied, values)
    }

    #[test]
    fn test_descriptor_lists_declared_types() {
        let d = MethodDescriptor::new(|_: &mut Counter, _: Controller, _: Form<Input>| ActionResult::not_found());
        let names: Vec<_> = d.param_types().iter().map(|p| p.type_name).collect();
        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("Counter"));
        assert!(names[1].ends_with("Controller"));
        assert!(names[2].contains("Form"));
    }

    #[test]
    fn test_invoke_binds_in_declared_order() {
        let d = MethodDescriptor::new(|c: &mut Counter, a: Action, ctl: Controller, Form(input): Form<Input>| {
            c.calls += 1;
            ActionResult::redirect_to(ctl, a).with_param("name", input.name)
        });
        let (supplied, values) = pools();
        let mut counter = Counter::default();
        let result = d
            .invoke(&mut counter, &ParamBinder::new(&supplied, &values))
            .unwrap();
        assert_eq!(counter.calls, 1);
        assert_eq!(
            result,
            Some(ActionResult::redirect_to(Controller::new("Home"), Action::new("Index")).with_param("name", "O'Hara"))
        );
    }

    #[test]
    fn test_unit_return_means_no_result() {
        let d = MethodDescriptor::new(|_: &mut Counter| {});
        let (supplied, values) = pools();
        let out = d
            .invoke(&mut Counter::default(), &ParamBinder::new(&supplied, &values))
            .unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn test_err_return_becomes_error_result() {
        let d = MethodDescriptor::new(|_: &mut Counter| -> Result<ActionResult, String> { Err("boom".into()) });
        let (supplied, values) = pools();
        let out = d
            .invoke(&mut Counter::default(), &ParamBinder::new(&supplied, &values))
            .unwrap();
        assert_eq!(out, Some(ActionResult::error("boom")));
    }

    #[test]
    fn test_wrong_controller_type_is_rejected() {
        let d = MethodDescriptor::new(|_: &mut Counter| ActionResult::not_found());
        let (supplied, values) = pools();
        let err = d
            .invoke(&mut String::new(), &ParamBinder::new(&supplied, &values))
            .unwrap_err();
        assert!(matches!(err, BindError::ControllerMismatch { .. }));
    }
}
