use super::{AccessChecker, HandlerTable, Mvc};
use crate::config::MvcConfig;
use crate::controller::{ControllerFactory, ErasedController, MvcController};
use crate::error::{ConfigError, RegistrationError, ViewError};
use crate::handler::MethodDescriptor;
use crate::ids::{Action, Controller, ControllerAction, Method};
use crate::params::SuppliedParam;
use crate::router::{create_url, Router};
use crate::server::request::DEFAULT_MAX_FORM_BYTES;
use crate::static_files::StaticFiles;
use crate::view::{TemplateDescriptor, ViewFolderParser, Views, DEFAULT_VIEWS_SUFFIX};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Registration API, used during startup.
///
/// ```rust,ignore
/// let mut builder = MvcBuilder::new();
/// builder
///     .bind_controller(HomeController::default)
///     .parse_views_folder("views")?
///     .set_not_found_view(Some(ControllerAction::new("error", "notfound")))?;
/// let mvc = Arc::new(builder.build());
/// ```
pub struct MvcBuilder {
    handlers: HandlerTable,
    constructors: HashMap<Controller, ControllerFactory>,
    views: Views,
    views_root: PathBuf,
    views_suffix: String,
    router: Router,
    not_found_view: Option<ControllerAction>,
    internal_error_view: Option<ControllerAction>,
    access_checker: Option<Arc<dyn AccessChecker>>,
    provided: Vec<SuppliedParam>,
    max_form_bytes: usize,
}

impl Default for MvcBuilder {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            constructors: HashMap::new(),
            views: Views::default(),
            views_root: PathBuf::new(),
            views_suffix: DEFAULT_VIEWS_SUFFIX.to_string(),
            router: Router::new(),
            not_found_view: None,
            internal_error_view: None,
            access_checker: None,
            provided: Vec::new(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }
}

impl std::fmt::Debug for MvcBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvcBuilder")
            .field("controllers", &self.constructors.len())
            .field("views", &self.views.len())
            .field("views_root", &self.views_root)
            .field("views_suffix", &self.views_suffix)
            .field("routes", &self.router.route_count())
            .field("not_found_view", &self.not_found_view)
            .field("internal_error_view", &self.internal_error_view)
            .field("access_checker", &self.access_checker.is_some())
            .field("provided", &self.provided)
            .field("max_form_bytes", &self.max_form_bytes)
            .finish_non_exhaustive()
    }
}

impl MvcBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a controller and every action its [`MvcController::info`] lists.
    ///
    /// `constructor` runs once per request; each action is routed at
    /// `/{controller}/{action}` for its HTTP method.
    pub fn bind_controller<C, F>(&mut self, constructor: F) -> &mut Self
    where
        C: MvcController,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let (controller, actions) = C::info().into_parts();
        debug!(
            controller = %controller,
            actions = actions.len(),
            "Binding controller"
        );
        let factory: ControllerFactory =
            Arc::new(move || Box::new(constructor()) as Box<dyn ErasedController>);
        self.constructors.insert(controller.clone(), factory);

        for info in actions {
            self.bind_action(
                controller.clone(),
                info.action_name().clone(),
                info.http_method(),
                info.descriptor().clone(),
            );
        }
        self
    }

    fn bind_action(&mut self, c: Controller, a: Action, m: Method, descriptor: MethodDescriptor) {
        debug!(controller = %c, action = %a, method = %m, "Binding action");
        self.check_view_on_action_bind(&c, &a);

        let url = create_url(&c, &a, &[]);
        let methods = self
            .handlers
            .entry(c.clone())
            .or_default()
            .entry(a.clone())
            .or_default();
        if methods.insert(m.clone(), descriptor).is_some() {
            debug!(controller = %c, action = %a, method = %m, "Replaced existing action binding");
        }
        self.router.register(&url, Some(m), ControllerAction::new(c, a));
    }

    fn check_view_on_action_bind(&self, c: &Controller, a: &Action) {
        if !self.views.contains(c, a) {
            warn!(controller = %c, action = %a, "Added handler for missing view");
        }
    }

    fn check_handler_on_url_bind(&self, c: &Controller, a: &Action) {
        let bound = self
            .handlers
            .get(c)
            .is_some_and(|actions| actions.contains_key(a));
        if !bound {
            warn!(controller = %c, action = %a, "Added url for missing handler");
        }
    }

    /// Route `url` to a controller/action for any HTTP method. `{name}`
    /// segments are captured into the request values.
    pub fn bind_url(
        &mut self,
        controller: impl Into<Controller>,
        action: impl Into<Action>,
        url: &str,
    ) -> &mut Self {
        let (c, a) = (controller.into(), action.into());
        debug!(controller = %c, action = %a, url = %url, "Binding url");
        self.check_handler_on_url_bind(&c, &a);
        self.router.register(url, None, ControllerAction::new(c, a));
        self
    }

    /// Parse one template file into the view registry.
    pub fn bind_view(
        &mut self,
        controller: impl Into<Controller>,
        action: impl Into<Action>,
        template: impl AsRef<Path>,
    ) -> Result<&mut Self, ViewError> {
        let (c, a) = (controller.into(), action.into());
        debug!(controller = %c, action = %a, template = %template.as_ref().display(), "Binding view");
        let descriptor = TemplateDescriptor::parse(&self.views_root, template.as_ref())?;
        self.views.insert(c, a, descriptor);
        Ok(self)
    }

    /// Suffix of view files picked up by [`MvcBuilder::parse_views_folder`].
    pub fn set_views_suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        self.views_suffix = suffix.into();
        self
    }

    /// Register every `<dir>/<Controller>/<Action><suffix>` file as a view.
    /// Also sets the root that option paths resolve against.
    pub fn parse_views_folder(&mut self, dir: impl Into<PathBuf>) -> Result<&mut Self, ViewError> {
        let dir = dir.into();
        trace!(dir = %dir.display(), "Parsing views folder");
        self.views_root = dir.clone();
        let count = ViewFolderParser::new(dir.clone())
            .with_suffix(self.views_suffix.clone())
            .parse_into(&mut self.views)?;
        info!(dir = %dir.display(), views = count, "Views folder parsed");
        Ok(self)
    }

    pub fn set_not_found_view(&mut self, view: Option<ControllerAction>) -> Result<&mut Self, RegistrationError> {
        self.not_found_view = check_full("not-found", view)?;
        Ok(self)
    }

    pub fn set_internal_error_view(
        &mut self,
        view: Option<ControllerAction>,
    ) -> Result<&mut Self, RegistrationError> {
        self.internal_error_view = check_full("internal-error", view)?;
        Ok(self)
    }

    pub fn set_access_checker(&mut self, checker: impl AccessChecker + 'static) -> &mut Self {
        self.access_checker = Some(Arc::new(checker));
        self
    }

    /// Serve files below `dir` for request paths starting with `prefix`,
    /// with the prefix stripped. Missing files answer not found.
    pub fn serve_static(&mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> &mut Self {
        self.router.mount_static(prefix, StaticFiles::new(dir));
        self
    }

    /// Make an application value available to every handler, by exact type
    /// (`T`) or shared (`Arc<T>`).
    pub fn provide<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.provide_param(SuppliedParam::new(value))
    }

    /// Like [`MvcBuilder::provide`], with capabilities attached.
    pub fn provide_param(&mut self, param: SuppliedParam) -> &mut Self {
        debug!(param = param.type_name(), "Providing parameter");
        self.provided.push(param);
        self
    }

    /// Largest POST form body read into the request values.
    pub fn set_max_form_bytes(&mut self, limit: usize) -> &mut Self {
        self.max_form_bytes = limit;
        self
    }

    /// Apply views folder, view suffix, static mount, error views and limits.
    pub fn apply_config(&mut self, config: &MvcConfig) -> Result<&mut Self, ConfigError> {
        self.set_views_suffix(config.views.suffix.clone());
        if let Some(dir) = &config.views.dir {
            self.parse_views_folder(dir.clone())?;
        }
        if let Some(static_files) = &config.static_files {
            self.serve_static(static_files.prefix.clone(), static_files.dir.clone());
        }
        self.set_not_found_view(config.errors.not_found.clone())?;
        self.set_internal_error_view(config.errors.internal_error.clone())?;
        self.set_max_form_bytes(config.limits.max_form_bytes);
        Ok(self)
    }

    /// Freeze the registries.
    pub fn build(self) -> Mvc {
        info!(
            controllers = self.constructors.len(),
            views = self.views.len(),
            routes = self.router.route_count(),
            "MVC infrastructure ready"
        );
        Mvc {
            handlers: self.handlers,
            constructors: self.constructors,
            views: self.views,
            router: self.router,
            not_found_view: self.not_found_view,
            internal_error_view: self.internal_error_view,
            access_checker: self.access_checker,
            provided: self.provided,
            max_form_bytes: self.max_form_bytes,
        }
    }
}

fn check_full(
    kind: &'static str,
    view: Option<ControllerAction>,
) -> Result<Option<ControllerAction>, RegistrationError> {
    match view {
        Some(pair) if !pair.is_full() => Err(RegistrationError::IncompleteViewPair { kind, pair }),
        other => Ok(other),
    }
}
