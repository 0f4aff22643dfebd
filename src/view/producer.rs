use super::descriptor::TemplateDescriptor;
use crate::error::{panic_message, ViewError};
use minijinja::value::ValueKind;
use minijinja::{AutoEscape, Environment, Value};
use std::collections::BTreeMap;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, trace};

/// Name the content template is registered under. Master pages render it
/// with `{% include "content" %}`.
pub const CONTENT_TEMPLATE: &str = "content";

/// Key the whole view-model is exposed under in the template context.
pub const MODEL_KEY: &str = "model";

/// Render a view against a view-model.
///
/// Templates are read from disk on every call. Any fault raised while
/// rendering, panics included, comes back as an error.
pub fn render_page(descriptor: &TemplateDescriptor, view_model: &Value) -> Result<Vec<u8>, ViewError> {
    debug!(
        content = %descriptor.content.display(),
        master = ?descriptor.master_page,
        "Rendering page"
    );
    catch_unwind(AssertUnwindSafe(|| compose_and_render(descriptor, view_model)))
        .unwrap_or_else(|payload| Err(ViewError::Panic(panic_message(payload.as_ref()))))
}

fn compose_and_render(descriptor: &TemplateDescriptor, view_model: &Value) -> Result<Vec<u8>, ViewError> {
    let content = read_template(&descriptor.content)?;
    let master = match &descriptor.master_page {
        Some(path) => Some((descriptor.include_name(path), read_template(path)?)),
        None => None,
    };
    let mut includes = Vec::with_capacity(descriptor.additional.len());
    for path in &descriptor.additional {
        trace!(path = %path.display(), "Loading additional template");
        includes.push((descriptor.include_name(path), read_template(path)?));
    }

    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.add_function("equals", equals);

    let root = match &master {
        Some((name, source)) => {
            env.add_template(name, source)?;
            env.add_template(CONTENT_TEMPLATE, &content)?;
            name.as_str()
        }
        None => {
            env.add_template(CONTENT_TEMPLATE, &content)?;
            CONTENT_TEMPLATE
        }
    };
    for (name, source) in &includes {
        env.add_template(name, source)?;
    }

    let rendered = env.get_template(root)?.render(view_context(view_model))?;
    Ok(rendered.into_bytes())
}

fn read_template(path: &Path) -> Result<String, ViewError> {
    fs::read_to_string(path).map_err(|source| ViewError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Template context: the entries of a map view-model at the top level, and
/// the whole view-model under [`MODEL_KEY`].
fn view_context(view_model: &Value) -> Value {
    let mut ctx: BTreeMap<String, Value> = BTreeMap::new();
    if view_model.kind() == ValueKind::Map {
        if let Ok(keys) = view_model.try_iter() {
            for key in keys {
                if let (Some(name), Ok(value)) = (key.as_str(), view_model.get_item(&key)) {
                    ctx.insert(name.to_string(), value);
                }
            }
        }
    }
    ctx.insert(MODEL_KEY.to_string(), view_model.clone());
    Value::from_serialize(&ctx)
}

/// `equals(a, b)`: true when both values have the same kind and are equal.
fn equals(a: Value, b: Value) -> bool {
    a.kind() == b.kind() && a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(root: &Path, rel: &str, body: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_renders_without_master() {
        let dir = tempfile::tempdir().unwrap();
        let page = write(dir.path(), "Home/Index.ghtml", "<p>Hi {{ name }}</p>");
        let d = TemplateDescriptor::parse(dir.path(), &page).unwrap();
        let out = render_page(&d, &Value::from_serialize(serde_json::json!({"name": "Ann"}))).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<p>Hi Ann</p>");
    }

    #[test]
    fn test_master_page_includes_content_and_additional() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "layout.ghtml", "<html>{% include \"shared/nav.ghtml\" %}|{% include \"content\" %}</html>");
        write(dir.path(), "shared/nav.ghtml", "<nav>{{ model.title }}</nav>");
        let page = write(
            dir.path(),
            "Home/Index.ghtml",
            "{% macro ViewOptions() %}\nMasterPage=layout.ghtml\nAdditionalTemplate=shared/nav.ghtml\n{% endmacro %}<main>{{ title }}</main>",
        );
        let d = TemplateDescriptor::parse(dir.path(), &page).unwrap();
        let out = render_page(&d, &Value::from_serialize(serde_json::json!({"title": "T"}))).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<html><nav>T</nav>|<main>T</main></html>");
    }

    #[test]
    fn test_scalar_model_is_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let page = write(dir.path(), "Error/NotFound.ghtml", "missing: {{ model }}");
        let d = TemplateDescriptor::parse(dir.path(), &page).unwrap();
        let out = render_page(&d, &Value::from("/a/b")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "missing: /a/b");
    }

    #[test]
    fn test_equals_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let page = write(
            dir.path(),
            "A/B.ghtml",
            "{{ equals(n, 1) }} {{ equals(n, \"1\") }} {{ equals(s, \"x\") }}",
        );
        let d = TemplateDescriptor::parse(dir.path(), &page).unwrap();
        let out = render_page(&d, &Value::from_serialize(serde_json::json!({"n": 1, "s": "x"}))).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "true false true");
    }

    #[test]
    fn test_output_is_html_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let page = write(dir.path(), "A/B.ghtml", "{{ v }}");
        let d = TemplateDescriptor::parse(dir.path(), &page).unwrap();
        let out = render_page(&d, &Value::from_serialize(serde_json::json!({"v": "<b>"}))).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "&lt;b&gt;");
    }

    #[test]
    fn test_faults_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "A/Bad.ghtml", "{% if %}");
        let d = TemplateDescriptor::parse(dir.path(), &bad).unwrap();
        assert!(matches!(render_page(&d, &Value::UNDEFINED), Err(ViewError::Template(_))));

        let missing_master = write(
            dir.path(),
            "A/C.ghtml",
            "{% macro ViewOptions() %}\nMasterPage=nope.ghtml\n{% endmacro %}",
        );
        let d = TemplateDescriptor::parse(dir.path(), &missing_master).unwrap();
        assert!(matches!(render_page(&d, &Value::UNDEFINED), Err(ViewError::Read { .. })));
    }
}
