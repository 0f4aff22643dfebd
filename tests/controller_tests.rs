use brrtmvc::prelude::*;

#[derive(Default, MvcController)]
struct ShopController {
    base: BaseController,
    visits: u32,
}

#[controller]
impl ShopController {
    pub fn list(&mut self) -> ActionResult {
        self.visits += 1;
        ActionResult::view(&self.visits)
    }

    #[action(method = "POST", name = "list")]
    pub fn save_list(&mut self, _values: ValuePool) -> ActionResult {
        ActionResult::redirect_to("", "list")
    }

    #[action(method = "PATCH")]
    pub fn touch(&mut self, response: ResponseWriter) {
        response.write_status(204);
    }

    // Not public, not an action.
    fn helper(&mut self) -> ActionResult {
        ActionResult::not_found()
    }

    // Returns something other than ActionResult, not an action.
    pub fn count(&mut self) -> u32 {
        self.visits
    }

    // No receiver, not an action.
    pub fn create() -> Self {
        Self::default()
    }
}

#[derive(Default, MvcController)]
struct ReportsController {
    #[base]
    inner: BaseController,
}

#[controller(lowercase)]
impl ReportsController {
    pub fn daily(&mut self) -> ActionResult {
        ActionResult::not_found()
    }

    #[action(name = "Weekly")]
    pub fn weekly_report(&mut self) -> Option<ActionResult> {
        None
    }
}

#[test]
fn test_eligible_methods_become_get_actions() {
    let info = ShopController::info();
    assert_eq!(info.controller(), Controller::new("Shop"));
    let names: Vec<_> = info.method_names().collect();
    assert_eq!(names, vec!["list", "save_list", "touch"]);

    let list = info.get("list").unwrap();
    assert_eq!(list.http_method(), Method::GET);
    assert_eq!(list.action_name(), &Action::new("list"));
    assert!(info.get("helper").is_none());
    assert!(info.get("count").is_none());
    assert!(info.get("create").is_none());
}

#[test]
fn test_action_attribute_sets_method_and_name() {
    let info = ShopController::info();
    let save = info.get("save_list").unwrap();
    assert_eq!(save.http_method(), Method::POST);
    assert_eq!(save.action_name(), &Action::new("list"));

    let touch = info.get("touch").unwrap();
    assert_eq!(touch.http_method(), Method::PATCH);
    assert_eq!(touch.action_name(), &Action::new("touch"));
}

#[test]
fn test_descriptor_lists_parameter_types() {
    let info = ShopController::info();
    let types = info.get("save_list").unwrap().descriptor().param_types();
    assert_eq!(types.len(), 2);
    assert!(types[0].type_name.ends_with("ShopController"));
    assert!(types[1].type_name.ends_with("ValuePool"));
}

#[test]
fn test_lowercase_controller() {
    let (controller, actions) = ReportsController::info().into_parts();
    assert_eq!(controller, Controller::new("reports"));
    let names: Vec<_> = actions.iter().map(|a| a.action_name().to_string()).collect();
    assert_eq!(names, vec!["daily", "weekly"]);
}

#[test]
fn test_derived_base_accessors() {
    let mut shop = ShopController::create();
    shop.base_mut().set_action(Action::new("list"));
    assert_eq!(shop.base().action(), "list");
    assert_eq!(shop.count(), 0);
    assert_eq!(shop.helper(), ActionResult::NotFound);

    let mut reports = ReportsController::default();
    reports.base_mut().set_controller(Controller::new("reports"));
    assert_eq!(reports.inner.controller(), "reports");
}

#[test]
fn test_bound_controller_serves_each_method() {
    let mut builder = MvcBuilder::new();
    builder.bind_controller(ShopController::default);
    let mvc = builder.build();

    let post = mvc.handle(HttpRequest::new(Method::POST, "/Shop/list"));
    assert_eq!(post.status, 302);
    assert_eq!(post.header("Location"), Some("/Shop/list"));

    let patch = mvc.handle(HttpRequest::new(Method::PATCH, "/Shop/touch"));
    assert_eq!(patch.status, 204);
    assert!(patch.body.is_empty());

    assert!(mvc
        .handler(&Controller::new("Shop"), &Action::new("list"), &Method::GET)
        .is_some());
    assert!(mvc
        .handler(&Controller::new("Shop"), &Action::new("save_list"), &Method::POST)
        .is_none());
}
