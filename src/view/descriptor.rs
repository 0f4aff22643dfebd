use crate::error::ViewError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name a view's options macro must mention.
pub const VIEW_OPTIONS: &str = "ViewOptions";
pub const MASTER_PAGE_OPTION: &str = "MasterPage";
pub const ADDITIONAL_TEMPLATE_OPTION: &str = "AdditionalTemplate";

static OPTIONS_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\{{%[^%]*{VIEW_OPTIONS}[^%]*%\}}"))
        .expect("options open regex should be valid")
});

static BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{%-?\s*endmacro\s*-?%\}").expect("block end regex should be valid")
});

/// Composition options of one view file.
///
/// ```text
/// {% macro ViewOptions() %}
///     MasterPage=layout.ghtml
///     AdditionalTemplate=shared/nav.ghtml
/// {% endmacro %}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    /// The view file itself.
    pub content: PathBuf,
    /// Outer page the content is rendered into.
    pub master_page: Option<PathBuf>,
    /// Extra templates made available to the page, in declared order.
    pub additional: Vec<PathBuf>,
    /// Root option paths were resolved against.
    pub views_root: PathBuf,
}

impl TemplateDescriptor {
    /// Read `template` and parse its options block.
    pub fn parse(views_root: &Path, template: &Path) -> Result<Self, ViewError> {
        let source = fs::read_to_string(template).map_err(|source| ViewError::Read {
            path: template.to_path_buf(),
            source,
        })?;
        Ok(Self::from_source(views_root, template, &source))
    }

    /// Parse the options block of an already loaded template source.
    pub fn from_source(views_root: &Path, template: &Path, source: &str) -> Self {
        let mut descriptor = Self {
            content: template.to_path_buf(),
            master_page: None,
            additional: Vec::new(),
            views_root: views_root.to_path_buf(),
        };

        for line in option_lines(source) {
            if line.starts_with('{') {
                break;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                MASTER_PAGE_OPTION => {
                    descriptor.master_page = Some(views_root.join(value));
                }
                ADDITIONAL_TEMPLATE_OPTION => {
                    debug!(template = %value, "Additional template");
                    descriptor.additional.push(views_root.join(value));
                }
                _ => {}
            }
        }
        descriptor
    }

    /// Name an additional template is registered under when rendering:
    /// its path relative to the views root, with forward slashes.
    pub fn include_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.views_root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Trimmed, non-empty lines between the options open tag and the first
/// block end that follows it.
fn option_lines(source: &str) -> Vec<&str> {
    let Some(open) = OPTIONS_OPEN.find(source) else {
        return Vec::new();
    };
    let start = open.end();
    let Some(end) = BLOCK_END.find_at(source, start) else {
        return Vec::new();
    };
    source[start..end.start()]
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}
