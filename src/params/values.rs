use std::collections::HashMap;

/// String-keyed, multi-valued request data.
///
/// Holds the query string, the form body (POST only), path segment captures
/// and the synthetic `Controller` / `Action` entries of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuePool {
    values: HashMap<String, Vec<String>>,
}

impl ValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Replace every value under `name` with a single one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), vec![value.into()]);
        self
    }

    /// Append every value of `other`.
    pub fn merge(&mut self, other: ValuePool) -> &mut Self {
        for (name, vals) in other.values {
            self.values.entry(name).or_default().extend(vals);
        }
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Like [`ValuePool::get`], falling back to an ASCII case-insensitive match.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(&str, &[String])> {
        if let Some((k, v)) = self.values.get_key_value(name) {
            return Some((k.as_str(), v.as_slice()));
        }
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Last value under `name`, the one scalar decoding uses.
    #[must_use]
    pub fn last(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValuePool {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut pool = ValuePool::new();
        for (k, v) in iter {
            pool.add(k, v);
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_appends() {
        let mut a: ValuePool = [("x", "1")].into_iter().collect();
        let b: ValuePool = [("x", "2"), ("y", "3")].into_iter().collect();
        a.merge(b);
        assert_eq!(a.get("x"), Some(&["1".to_string(), "2".to_string()][..]));
        assert_eq!(a.last("y"), Some("3"));
    }

    #[test]
    fn test_set_replaces() {
        let mut pool: ValuePool = [("Action", "Fake")].into_iter().collect();
        pool.set("Action", "Index");
        assert_eq!(pool.get("Action"), Some(&["Index".to_string()][..]));
    }

    #[test]
    fn test_find_prefers_exact_key() {
        let pool: ValuePool = [("name", "lower"), ("Name", "upper")].into_iter().collect();
        assert_eq!(pool.find("Name").map(|(k, _)| k), Some("Name"));
        assert!(pool.find("NAME").is_some());
        assert!(pool.find("missing").is_none());
    }
}
