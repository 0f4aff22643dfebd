use brrtmvc::ids::{Action, Controller};
use brrtmvc::view::{render_page, TemplateDescriptor, ViewFolderParser};
use minijinja::Value;
use std::path::{Path, PathBuf};

mod common;
use common::VIEWS_DIR;

fn view(controller: &str, action: &str) -> TemplateDescriptor {
    let views = ViewFolderParser::new(VIEWS_DIR).parse().unwrap();
    views
        .get(&Controller::new(controller), &Action::new(action))
        .unwrap()
        .clone()
}

#[test]
fn test_folder_registers_every_controller_dir() {
    let views = ViewFolderParser::new(VIEWS_DIR).parse().unwrap();
    let names: Vec<String> = views
        .entries()
        .into_iter()
        .map(|(c, a, _)| format!("{c}/{a}"))
        .collect();
    assert_eq!(
        names,
        vec![
            "account/edit",
            "error/internal",
            "error/notfound",
            "home/about",
            "home/index",
            "shared/nav",
        ]
    );
}

#[test]
fn test_view_names_are_case_sensitive() {
    let views = ViewFolderParser::new(VIEWS_DIR).parse().unwrap();
    assert!(views.contains(&Controller::new("home"), &Action::new("index")));
    assert!(!views.contains(&Controller::new("Home"), &Action::new("Index")));
}

#[test]
fn test_options_block_resolves_against_root() {
    let d = view("home", "index");
    let root = Path::new(VIEWS_DIR);
    assert_eq!(d.content, root.join("home/index.ghtml"));
    assert_eq!(d.master_page, Some(root.join("layout.ghtml")));
    assert_eq!(d.additional, vec![root.join("shared/nav.ghtml")]);

    let plain = view("home", "about");
    assert_eq!(plain.master_page, None);
    assert!(plain.additional.is_empty());
}

#[test]
fn test_master_page_composition() {
    let d = view("home", "index");
    let model = Value::from_serialize(serde_json::json!({"title": "Hi", "user": "<bo>"}));
    let html = String::from_utf8(render_page(&d, &model).unwrap()).unwrap();
    assert!(html.starts_with("<html><head><title>Hi</title></head><body><nav>&lt;bo&gt;</nav>"));
    assert!(html.contains("<main>Hi</main>"));
    assert!(html.ends_with("</body></html>"));
}

#[test]
fn test_view_reads_templates_on_each_render() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("Live/Page.ghtml");
    std::fs::create_dir_all(page.parent().unwrap()).unwrap();
    std::fs::write(&page, "v1").unwrap();

    let d = TemplateDescriptor::parse(dir.path(), &page).unwrap();
    assert_eq!(render_page(&d, &Value::UNDEFINED).unwrap(), b"v1");
    std::fs::write(&page, "v2").unwrap();
    assert_eq!(render_page(&d, &Value::UNDEFINED).unwrap(), b"v2");

    std::fs::remove_file(&page).unwrap();
    assert!(render_page(&d, &Value::UNDEFINED).is_err());
}

#[test]
fn test_missing_root_is_an_error() {
    assert!(ViewFolderParser::new(PathBuf::from("tests/no-such-views"))
        .parse()
        .is_err());
}
