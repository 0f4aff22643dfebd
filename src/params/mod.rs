//! Parameter resolution for action handlers.
//!
//! A handler declares its parameters by type. Each one is resolved against
//! the request's [`SuppliedParams`] (exact type, then shared `Arc<T>`, then
//! capability `Box<C>`), and [`Form<T>`] parameters fall back to decoding a
//! fresh `T` from the [`ValuePool`].

mod form;
mod supplied;
mod values;

pub use form::{from_values, strip_quotes, Form};
pub use supplied::{ActionParam, ParamBinder, ParamType, Supplied, SuppliedParam, SuppliedParams};
pub use values::ValuePool;

use crate::ids::{Action, Controller, RequestId};
use crate::server::{HttpRequest, ResponseWriter};

crate::supplied_param!(Controller, Action, RequestId, HttpRequest, ResponseWriter);
