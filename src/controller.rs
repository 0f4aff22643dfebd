//! Controllers and the information used to bind them.
//!
//! A controller is a type implementing [`MvcController`]. Its logical name is
//! derived from the type name with a trailing `Controller` removed, and its
//! actions are listed by [`DiscoverActions`], which the `#[controller]`
//! attribute implements from the `impl` block:
//!
//! ```rust,ignore
//! use brrtmvc::prelude::*;
//!
//! #[derive(Default, MvcController)]
//! struct HomeController {
//!     base: BaseController,
//! }
//!
//! #[controller]
//! impl HomeController {
//!     // eligible: public, `&mut self`, returns `ActionResult`
//!     pub fn index(&mut self) -> ActionResult {
//!         ActionResult::view(&())
//!     }
//!
//!     #[action(method = "POST", name = "index")]
//!     pub fn save(&mut self, Form(input): Form<Input>) -> ActionResult {
//!         ActionResult::redirect_to("", "index")
//!     }
//! }
//! ```
//!
//! A new instance is constructed for every request, so per-request state
//! lives on the controller itself.

use crate::handler::{ActionHandler, MethodDescriptor};
use crate::ids::{Action, Controller, Method};
use crate::result::ActionResult;
use crate::server::{HttpRequest, ResponseWriter};
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const CONTROLLER_SUFFIX: &str = "controller";

/// Per-request state every controller carries.
#[derive(Debug, Clone, Default)]
pub struct BaseController {
    controller: Controller,
    action: Action,
    request: Option<Arc<HttpRequest>>,
    response: Option<ResponseWriter>,
}

impl BaseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_controller(&mut self, controller: Controller) {
        self.controller = controller;
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = action;
    }

    pub fn set_request(&mut self, request: Arc<HttpRequest>) {
        self.request = Some(request);
    }

    pub fn set_response(&mut self, response: ResponseWriter) {
        self.response = Some(response);
    }

    #[must_use]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// The request being served; `None` outside a dispatch.
    #[must_use]
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_deref()
    }

    #[must_use]
    pub fn response(&self) -> Option<&ResponseWriter> {
        self.response.as_ref()
    }
}

/// Lists the actions of a controller type.
pub trait DiscoverActions: Sized + 'static {
    /// Lower-case the controller name and every action name.
    const LOWERCASE: bool = false;

    fn discover_actions(info: &mut ControllerInfo<Self>);
}

pub trait MvcController: DiscoverActions + Send {
    fn base(&self) -> &BaseController;

    fn base_mut(&mut self) -> &mut BaseController;

    /// Name and actions of this controller, used once at bind time.
    fn info() -> ControllerInfo<Self> {
        let mut info = ControllerInfo::from_type_name();
        if Self::LOWERCASE {
            info = info.lowercase();
        }
        Self::discover_actions(&mut info);
        info
    }
}

/// Builder record for one action, consumed when the controller is bound.
#[derive(Clone)]
pub struct ActionInfo {
    handler: MethodDescriptor,
    method: Option<Method>,
    action: Action,
}

impl ActionInfo {
    pub fn new(handler: MethodDescriptor, action: impl Into<Action>) -> Self {
        Self {
            handler,
            method: None,
            action: action.into(),
        }
    }

    /// Serve a different HTTP method than GET.
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// Like [`ActionInfo::method`], from a method name. Invalid names are
    /// logged and ignored.
    pub fn method_str(&mut self, method: &str) -> &mut Self {
        match Method::from_bytes(method.as_bytes()) {
            Ok(m) => self.method(m),
            Err(e) => {
                warn!(method = %method, error = %e, "Invalid HTTP method on action, keeping GET");
                self
            }
        }
    }

    /// Bind under a different action name than the method name.
    pub fn action(&mut self, action: impl Into<Action>) -> &mut Self {
        self.action = action.into();
        self
    }

    /// HTTP method, GET unless set.
    #[must_use]
    pub fn http_method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    #[must_use]
    pub fn action_name(&self) -> &Action {
        &self.action
    }

    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.handler
    }
}

impl fmt::Debug for ActionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionInfo")
            .field("action", &self.action)
            .field("method", &self.http_method())
            .field("handler", &self.handler.handler_name())
            .finish()
    }
}

/// Name and action set of controller type `C`.
pub struct ControllerInfo<C> {
    controller: Controller,
    lowercase: bool,
    /// Keyed by the method name the action was found under.
    actions: Vec<(&'static str, ActionInfo)>,
    /// Methods that may be added with [`ControllerInfo::add_action`].
    catalog: Vec<(&'static str, MethodDescriptor)>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: 'static> ControllerInfo<C> {
    pub fn new(controller: impl Into<Controller>) -> Self {
        Self {
            controller: controller.into(),
            lowercase: false,
            actions: Vec::new(),
            catalog: Vec::new(),
            _controller: PhantomData,
        }
    }

    /// Derive the controller name from the type name of `C`.
    pub fn from_type_name() -> Self {
        let name = controller_name(type_name::<C>());
        debug!(type_name = type_name::<C>(), controller = %name, "Controller name derived");
        Self::new(name)
    }

    /// Lower-case the controller name and all action names, including ones
    /// added later.
    #[must_use]
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Add an eligible action: a handler returning exactly [`ActionResult`].
    pub fn discover<Args, H>(&mut self, name: &'static str, handler: H) -> &mut ActionInfo
    where
        H: ActionHandler<C, Args, Output = ActionResult>,
    {
        trace!(controller = %self.controller, method = name, "Action discovered");
        self.insert(name, MethodDescriptor::new::<C, Args, H>(handler))
    }

    /// Make a handler of any signature available to [`ControllerInfo::add_action`].
    pub fn register<Args, H>(&mut self, name: &'static str, handler: H) -> &mut Self
    where
        H: ActionHandler<C, Args>,
    {
        let descriptor = MethodDescriptor::new::<C, Args, H>(handler);
        match self.catalog.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = descriptor,
            None => self.catalog.push((name, descriptor)),
        }
        self
    }

    /// Add a registered method as an action. Returns `None` when no method
    /// of that name was registered or discovered.
    pub fn add_action(&mut self, name: &str) -> Option<&mut ActionInfo> {
        let descriptor = self
            .catalog
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, d)| (*n, d.clone()))
            .or_else(|| {
                self.actions
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(n, info)| (*n, info.handler.clone()))
            });
        match descriptor {
            Some((name, descriptor)) => Some(self.insert(name, descriptor)),
            None => {
                warn!(controller = %self.controller, method = %name, "No such method to add as action");
                None
            }
        }
    }

    fn insert(&mut self, name: &'static str, handler: MethodDescriptor) -> &mut ActionInfo {
        let info = ActionInfo::new(handler, name);
        let idx = match self.actions.iter().position(|(n, _)| *n == name) {
            Some(idx) => {
                self.actions[idx].1 = info;
                idx
            }
            None => {
                self.actions.push((name, info));
                self.actions.len() - 1
            }
        };
        &mut self.actions[idx].1
    }

    #[must_use]
    pub fn controller(&self) -> Controller {
        if self.lowercase {
            self.controller.to_lowercase()
        } else {
            self.controller.clone()
        }
    }

    /// Method names the actions were found under, in discovery order.
    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().map(|(n, _)| *n)
    }

    #[must_use]
    pub fn get(&self, method_name: &str) -> Option<&ActionInfo> {
        self.actions
            .iter()
            .find(|(n, _)| *n == method_name)
            .map(|(_, info)| info)
    }

    /// Final controller name and action infos, names normalized.
    pub fn into_parts(self) -> (Controller, Vec<ActionInfo>) {
        let controller = self.controller();
        let lowercase = self.lowercase;
        let actions = self
            .actions
            .into_iter()
            .map(|(_, mut info)| {
                if lowercase {
                    info.action = info.action.to_lowercase();
                }
                info
            })
            .collect();
        (controller, actions)
    }
}

impl<C> fmt::Debug for ControllerInfo<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerInfo")
            .field("controller", &self.controller)
            .field("lowercase", &self.lowercase)
            .field("actions", &self.actions)
            .finish()
    }
}

/// `my_app::web::HomeController<T>` -> `Home`.
fn controller_name(type_name: &str) -> String {
    let path = type_name.split('<').next().unwrap_or(type_name);
    let name = path.rsplit("::").next().unwrap_or(path);
    let split = name.len().saturating_sub(CONTROLLER_SUFFIX.len());
    match (name.get(..split), name.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(CONTROLLER_SUFFIX) => head.to_string(),
        _ => name.to_string(),
    }
}

/// Object-safe view of a controller instance used by the dispatcher.
pub(crate) trait ErasedController: Send {
    fn base_mut(&mut self) -> &mut BaseController;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: MvcController> ErasedController for C {
    fn base_mut(&mut self) -> &mut BaseController {
        MvcController::base_mut(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) type ControllerFactory = Arc<dyn Fn() -> Box<dyn ErasedController> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct HomeController {
        base: BaseController,
    }

    impl HomeController {
        fn index(&mut self) -> ActionResult {
            ActionResult::not_found()
        }

        fn raw(&mut self, _w: ResponseWriter) {}
    }

    impl DiscoverActions for HomeController {
        fn discover_actions(info: &mut ControllerInfo<Self>) {
            info.discover("Index", Self::index);
            info.register("Raw", Self::raw);
        }
    }

    impl MvcController for HomeController {
        fn base(&self) -> &BaseController {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseController {
            &mut self.base
        }
    }

    #[test]
    fn test_controller_name_strips_suffix() {
        assert_eq!(controller_name("app::web::HomeController"), "Home");
        assert_eq!(controller_name("app::ShopCONTROLLER"), "Shop");
        assert_eq!(controller_name("app::Gallery<u8>"), "Gallery");
        assert_eq!(controller_name("Controller"), "");
    }

    #[test]
    fn test_info_lists_discovered_actions_only() {
        let info = HomeController::info();
        assert_eq!(info.controller(), Controller::new("Home"));
        assert_eq!(info.method_names().collect::<Vec<_>>(), vec!["Index"]);
        assert_eq!(info.get("Index").unwrap().http_method(), Method::GET);
    }

    #[test]
    fn test_add_action_promotes_registered_method() {
        let mut info = HomeController::info();
        info.add_action("Raw").unwrap().method(Method::POST);
        assert!(info.add_action("Missing").is_none());
        let raw = info.get("Raw").unwrap();
        assert_eq!(raw.http_method(), Method::POST);
        assert_eq!(raw.action_name(), &Action::new("Raw"));
    }

    #[test]
    fn test_action_info_chaining() {
        let mut info = HomeController::info();
        info.add_action("Index")
            .unwrap()
            .method_str("PUT")
            .action("Replace")
            .method_str("not a method");
        let parts = info.into_parts().1;
        assert_eq!(parts[0].action_name(), &Action::new("Replace"));
        assert_eq!(parts[0].http_method(), Method::PUT);
    }

    #[test]
    fn test_lowercase_variant() {
        let mut info = HomeController::info().lowercase();
        info.add_action("Raw");
        let (controller, actions) = info.into_parts();
        assert_eq!(controller, Controller::new("home"));
        let names: Vec<_> = actions.iter().map(|a| a.action_name().to_string()).collect();
        assert_eq!(names, vec!["index", "raw"]);
    }

    #[test]
    fn test_base_controller_state() {
        let mut base = BaseController::new();
        assert!(base.request().is_none());
        base.set_controller(Controller::new("Home"));
        base.set_action(Action::new("Index"));
        base.set_request(Arc::new(HttpRequest::new(Method::GET, "/Home/Index")));
        base.set_response(ResponseWriter::new());
        assert_eq!(base.controller(), "Home");
        assert_eq!(base.action(), "Index");
        assert_eq!(base.request().unwrap().path, "/Home/Index");
        assert!(base.response().is_some());
    }
}
