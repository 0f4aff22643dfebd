//! Radix tree for path matching.
//!
//! Paths are split into `/`-separated segments. Static segments match
//! exactly, `{name}` segments match any single segment and capture it.
//! Static children are tried before parameter children, with backtracking.
//! Each terminal node holds the targets registered at that path, keyed by an
//! optional HTTP method (`None` accepts any method).

use http::Method;
use std::borrow::Cow;

#[derive(Clone, Debug)]
struct RadixNode<T> {
    /// The path segment this node represents (without leading /)
    segment: Cow<'static, str>,
    /// Targets registered at this exact path, in registration order
    routes: Vec<(Option<Method>, T)>,
    /// Parameter name if this segment is a path parameter (e.g., "{id}" -> Some("id"))
    param_name: Option<Cow<'static, str>>,
    children: Vec<RadixNode<T>>,
    /// One child per distinct parameter name at this position
    param_children: Vec<RadixNode<T>>,
}

impl<T: Clone> RadixNode<T> {
    fn new(segment: Cow<'static, str>) -> Self {
        Self {
            segment,
            routes: Vec::new(),
            param_name: None,
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn new_param(param_name: Cow<'static, str>) -> Self {
        Self {
            param_name: Some(param_name),
            ..Self::new(Cow::Borrowed(""))
        }
    }

    /// Store a target; a second registration for the same method replaces the first.
    fn store(&mut self, method: Option<Method>, target: T) {
        match self.routes.iter_mut().find(|(m, _)| *m == method) {
            Some(existing) => existing.1 = target,
            None => self.routes.push((method, target)),
        }
    }

    fn insert(&mut self, segments: &[&str], method: Option<Method>, target: T) {
        let Some((&segment, remaining)) = segments.split_first() else {
            self.store(method, target);
            return;
        };

        if segment.starts_with('{') && segment.ends_with('}') {
            let param_name = segment.trim_start_matches('{').trim_end_matches('}');
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(param_name))
            {
                child.insert(remaining, method, target);
                return;
            }
            let mut child = RadixNode::new_param(Cow::Owned(param_name.to_string()));
            child.insert(remaining, method, target);
            self.param_children.push(child);
            return;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == segment) {
            child.insert(remaining, method, target);
            return;
        }
        let mut child = RadixNode::new(Cow::Owned(segment.to_string()));
        child.insert(remaining, method, target);
        self.children.push(child);
    }

    /// Pick the target for `method`: an exact method entry, then an
    /// any-method entry, then the first entry at the path.
    fn select(&self, method: &Method) -> Option<&T> {
        self.routes
            .iter()
            .find(|(m, _)| m.as_ref() == Some(method))
            .or_else(|| self.routes.iter().find(|(m, _)| m.is_none()))
            .or_else(|| self.routes.first())
            .map(|(_, t)| t)
    }

    fn search(&self, segments: &[&str], method: &Method, params: &mut Vec<(String, String)>) -> Option<T> {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.select(method).cloned();
        };

        for child in &self.children {
            if child.segment == segment {
                if let Some(target) = child.search(remaining, method, params) {
                    return Some(target);
                }
            }
        }

        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                params.push((name.to_string(), segment.to_string()));
                if let Some(target) = child.search(remaining, method, params) {
                    return Some(target);
                }
                params.pop();
            }
        }

        None
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Radix tree over path patterns.
#[derive(Clone, Debug)]
pub struct RadixRouter<T> {
    root: RadixNode<T>,
}

impl<T: Clone> Default for RadixRouter<T> {
    fn default() -> Self {
        Self {
            root: RadixNode::new(Cow::Borrowed("")),
        }
    }
}

impl<T: Clone> RadixRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: &str, method: Option<Method>, target: T) {
        self.root.insert(&split_path(pattern), method, target);
    }

    /// Match a request path, returning the target and captured parameters.
    pub fn route(&self, method: &Method, path: &str) -> Option<(T, Vec<(String, String)>)> {
        let mut params = Vec::new();
        let target = self.root.search(&split_path(path), method, &mut params)?;
        Some((target, params))
    }
}
