//! # brrtmvc
//!
//! Controller/action dispatch for `may_minihttp` services.
//!
//! A request to `/{controller}/{action}` is routed to a handler method of a
//! freshly constructed controller. The handler's parameters are bound by
//! type from framework values (request, response, identifiers), from values
//! the application provided at startup, or decoded from the query string and
//! form body. The handler returns an [`ActionResult`] that renders a view,
//! redirects, or answers with an error.
//!
//! ## Modules
//!
//! - **[`controller`]** - controller trait, per-request state, action discovery
//! - **[`params`]** - supplied-parameter pool, value pool and form decoding
//! - **[`handler`]** - bound handler descriptors
//! - **[`result`]** - the action result protocol
//! - **[`view`]** - view registry, options block parser and page composition
//! - **[`router`]** - path matching and URL helpers
//! - **[`mvc`]** - registration API and the request state machine
//! - **[`server`]** - owned request/response types and the HTTP adapter
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - ambient setup
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtmvc::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Default, MvcController)]
//! struct HomeController {
//!     base: BaseController,
//! }
//!
//! #[derive(serde::Serialize, serde::Deserialize, Default)]
//! #[serde(default)]
//! struct Greeting {
//!     name: String,
//! }
//!
//! #[controller(lowercase)]
//! impl HomeController {
//!     pub fn index(&mut self, Form(greeting): Form<Greeting>) -> ActionResult {
//!         ActionResult::view(&greeting)
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut builder = MvcBuilder::new();
//!     builder
//!         .parse_views_folder("views")?
//!         .bind_controller(HomeController::default);
//!     let mvc = Arc::new(builder.build());
//!     HttpServer(AppService::new(mvc)).start("0.0.0.0:8080")?.join().ok();
//!     Ok(())
//! }
//! ```

extern crate self as brrtmvc;

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod mvc;
pub mod params;
pub mod result;
pub mod router;
pub mod server;
pub mod static_files;
pub mod view;

pub use brrtmvc_macros::{controller, MvcController};
pub use controller::{ActionInfo, BaseController, ControllerInfo, DiscoverActions, MvcController};
pub use ids::{Action, Controller, ControllerAction, Method, RequestId};
pub use mvc::{AccessChecker, Mvc, MvcBuilder};
pub use result::ActionResult;

/// Everything an application module usually needs.
pub mod prelude {
    pub use crate::controller::{BaseController, ControllerInfo, DiscoverActions, MvcController};
    pub use crate::ids::{a, c, Action, Controller, ControllerAction, Method};
    pub use crate::mvc::{AccessChecker, Mvc, MvcBuilder};
    pub use crate::params::{Form, Supplied, ValuePool};
    pub use crate::result::ActionResult;
    pub use crate::server::{AppService, HttpRequest, HttpServer, ResponseWriter};
    pub use brrtmvc_macros::{controller, MvcController};
}
