use super::*;

fn ca(c: &str, a: &str) -> ControllerAction {
    ControllerAction::new(c, a)
}

fn action(routed: Routed<'_>) -> RouteMatch {
    match routed {
        Routed::Action(m) => m,
        other => panic!("expected an action route, got {other:?}"),
    }
}

#[test]
fn test_generated_route_matches_its_method() {
    let mut router = Router::new();
    router.register("/home/index", Some(Method::GET), ca("home", "index"));
    router.register("/home/save", Some(Method::POST), ca("home", "save"));

    let m = action(router.route(&Method::GET, "/home/index"));
    assert_eq!(m.target, ca("home", "index"));
    assert!(m.path_params.is_empty());

    let m = action(router.route(&Method::POST, "/home/save"));
    assert_eq!(m.target, ca("home", "save"));
    assert_eq!(router.route_count(), 2);
}

#[test]
fn test_other_methods_still_reach_the_pair() {
    let mut router = Router::new();
    router.register("/home/index", Some(Method::GET), ca("home", "index"));
    let m = action(router.route(&Method::DELETE, "/home/index"));
    assert_eq!(m.target, ca("home", "index"));
}

#[test]
fn test_bound_url_captures_params() {
    let mut router = Router::new();
    router.register("/blog/{year}/{slug}", None, ca("blog", "show"));
    let m = action(router.route(&Method::GET, "/blog/2024/hello"));
    assert_eq!(m.target, ca("blog", "show"));
    assert_eq!(m.get_path_param("year"), Some("2024"));
    assert_eq!(m.get_path_param("slug"), Some("hello"));
    assert_eq!(m.get_path_param("missing"), None);
}

#[test]
fn test_trailing_slash_is_ignored() {
    let mut router = Router::new();
    router.register("/home/index", Some(Method::GET), ca("home", "index"));
    assert!(matches!(router.route(&Method::GET, "/home/index/"), Routed::Action(_)));
}

#[test]
fn test_static_mount_strips_prefix() {
    let mut router = Router::new();
    router.mount_static("/static/", StaticFiles::new("tests/staticdata"));
    match router.route(&Method::GET, "/static/css/site.css") {
        Routed::Static { path, .. } => assert_eq!(path, "css/site.css"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_actions_win_over_static_mounts() {
    let mut router = Router::new();
    router.mount_static("/", StaticFiles::new("tests/staticdata"));
    router.register("/home/index", Some(Method::GET), ca("home", "index"));
    assert!(matches!(router.route(&Method::GET, "/home/index"), Routed::Action(_)));
    assert!(matches!(router.route(&Method::GET, "/hello.txt"), Routed::Static { .. }));
}

#[test]
fn test_unmatched_path_is_not_found() {
    let mut router = Router::new();
    router.register("/home/index", Some(Method::GET), ca("home", "index"));
    router.mount_static("/static/", StaticFiles::new("tests/staticdata"));
    assert!(matches!(router.route(&Method::GET, "/nope"), Routed::NotFound));
    assert!(matches!(router.route(&Method::GET, "/home"), Routed::NotFound));
}

#[test]
fn test_create_url() {
    let c = Controller::new("C");
    let a = Action::new("X");
    assert_eq!(create_url(&c, &a, &[]), "/C/X");
    let params = vec![
        ("id".to_string(), "7".to_string()),
        ("q".to_string(), "a b".to_string()),
    ];
    assert_eq!(create_url(&c, &a, &params), "/C/X?id=7&q=a b");
}

#[test]
fn test_parse_url() {
    assert_eq!(parse_url("/Home/Index"), (Controller::new("Home"), Action::new("Index")));
    assert_eq!(parse_url("/Home/Index/42"), (Controller::new("Home"), Action::new("Index")));
    assert_eq!(parse_url("/Home"), (Controller::new("Home"), Action::default()));
    assert_eq!(parse_url(""), (Controller::default(), Action::default()));
}
