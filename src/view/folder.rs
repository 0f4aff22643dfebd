use super::descriptor::TemplateDescriptor;
use super::Views;
use crate::error::ViewError;
use crate::ids::{Action, Controller};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Default view file suffix.
pub const DEFAULT_VIEWS_SUFFIX: &str = ".ghtml";

/// Scans a views folder laid out as one directory per controller holding
/// one `<Action><suffix>` file per action:
///
/// ```text
/// views/
///   Home/
///     Index.ghtml
///     About.ghtml
/// ```
#[derive(Debug, Clone)]
pub struct ViewFolderParser {
    root: PathBuf,
    suffix: String,
}

impl ViewFolderParser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffix: DEFAULT_VIEWS_SUFFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parse every view under the root into `views`.
    ///
    /// Files at the root and files without the suffix are skipped. A view
    /// file that cannot be read is logged and skipped.
    pub fn parse_into(&self, views: &mut Views) -> Result<usize, ViewError> {
        let mut bound = 0;
        for (controller, dir) in self.controller_dirs()? {
            debug!(controller = %controller, "Scanning controller views");
            for (action, path) in self.action_files(&dir)? {
                match TemplateDescriptor::parse(&self.root, &path) {
                    Ok(descriptor) => {
                        debug!(controller = %controller, action = %action, path = %path.display(), "View bound");
                        views.insert(controller.clone(), action, descriptor);
                        bound += 1;
                    }
                    Err(e) => {
                        error!(controller = %controller, action = %action, error = %e, "Cannot parse view");
                    }
                }
            }
        }
        Ok(bound)
    }

    pub fn parse(&self) -> Result<Views, ViewError> {
        let mut views = Views::default();
        self.parse_into(&mut views)?;
        Ok(views)
    }

    fn controller_dirs(&self) -> Result<Vec<(Controller, PathBuf)>, ViewError> {
        let meta = fs::metadata(&self.root).map_err(|source| ViewError::Read {
            path: self.root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ViewError::NotADirectory(self.root.clone()));
        }
        let mut dirs: Vec<(Controller, PathBuf)> = read_dir_sorted(&self.root)?
            .into_iter()
            .filter(|p| p.is_dir())
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?.to_string();
                Some((Controller::from(name), p))
            })
            .collect();
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }

    fn action_files(&self, dir: &Path) -> Result<Vec<(Action, PathBuf)>, ViewError> {
        Ok(read_dir_sorted(dir)?
            .into_iter()
            .filter(|p| p.is_file())
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?;
                let action = name.strip_suffix(self.suffix.as_str())?;
                Some((Action::new(action), p))
            })
            .collect())
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, ViewError> {
    let read_err = |source| ViewError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        paths.push(entry.map_err(read_err)?.path());
    }
    paths.sort();
    Ok(paths)
}
