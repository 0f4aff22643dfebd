//! View registry, view file options and page composition.

mod descriptor;
mod folder;
mod producer;

pub use descriptor::{
    TemplateDescriptor, ADDITIONAL_TEMPLATE_OPTION, MASTER_PAGE_OPTION, VIEW_OPTIONS,
};
pub use folder::{ViewFolderParser, DEFAULT_VIEWS_SUFFIX};
pub use producer::{render_page, CONTENT_TEMPLATE, MODEL_KEY};

use crate::error::ViewError;
use crate::ids::{Action, Controller};
use std::collections::HashMap;

/// `Controller → Action → TemplateDescriptor`.
#[derive(Debug, Clone, Default)]
pub struct Views {
    views: HashMap<Controller, HashMap<Action, TemplateDescriptor>>,
}

impl Views {
    /// Bind a view, replacing any previous one for the pair.
    pub fn insert(&mut self, controller: Controller, action: Action, descriptor: TemplateDescriptor) {
        self.views
            .entry(controller)
            .or_default()
            .insert(action, descriptor);
    }

    pub fn get(&self, controller: &Controller, action: &Action) -> Result<&TemplateDescriptor, ViewError> {
        self.views
            .get(controller)
            .ok_or_else(|| ViewError::ControllerNotFound(controller.to_string()))?
            .get(action)
            .ok_or_else(|| ViewError::ActionNotFound(action.to_string()))
    }

    #[must_use]
    pub fn contains(&self, controller: &Controller, action: &Action) -> bool {
        self.get(controller, action).is_ok()
    }

    /// Number of bound views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All bound views, sorted by controller then action.
    pub fn entries(&self) -> Vec<(&Controller, &Action, &TemplateDescriptor)> {
        let mut entries: Vec<_> = self
            .views
            .iter()
            .flat_map(|(c, actions)| actions.iter().map(move |(a, d)| (c, a, d)))
            .collect();
        entries.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        entries
    }
}
