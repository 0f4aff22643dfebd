//! Identifier types shared by the registries, the router and the action results.
//!
//! [`Controller`] and [`Action`] are opaque names. Equality is case-sensitive,
//! [`Controller::eq_ignore_case`] / [`Action::eq_ignore_case`] give the
//! case-insensitive comparison. HTTP methods are plain [`http::Method`] values,
//! so extension verbs work the same way as `GET` or `POST`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

pub use http::Method;

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(name: impl AsRef<str>) -> Self {
                Self(Arc::from(name.as_ref()))
            }

            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Case-insensitive comparison against a raw string.
            #[must_use]
            pub fn eq_ignore_case(&self, other: &str) -> bool {
                self.0.to_lowercase() == other.to_lowercase()
            }

            #[must_use]
            pub fn to_lowercase(&self) -> Self {
                Self::new(self.0.to_lowercase())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:?})", stringify!($name), &*self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                &*self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                &*self.0 == *other
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

name_type!(
    /// Name of a logical group of actions (first URL segment).
    Controller
);

name_type!(
    /// Name of one operation of a controller (second URL segment).
    Action
);

/// Shorthand constructor, reads well at registration sites: `c("Home")`.
pub fn c(name: &str) -> Controller {
    Controller::new(name)
}

/// Shorthand constructor, reads well at registration sites: `a("Index")`.
pub fn a(name: &str) -> Action {
    Action::new(name)
}

/// A controller/action pair, e.g. the configured not-found view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerAction {
    pub controller: Controller,
    pub action: Action,
}

impl ControllerAction {
    pub fn new(controller: impl Into<Controller>, action: impl Into<Action>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// True when both the controller and the action are non-empty.
    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.controller.is_empty() && !self.action.is_empty()
    }
}

impl Display for ControllerAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.controller, self.action)
    }
}

/// Strongly typed request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Attempt to parse from a header string; if invalid, generate a new one.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(RequestId(id))
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<RequestId>()
            .map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_case_sensitive() {
        assert_ne!(Controller::new("Home"), Controller::new("home"));
        assert_eq!(Action::new("Index"), "Index");
    }

    #[test]
    fn test_eq_ignore_case() {
        assert!(Controller::new("Home").eq_ignore_case("HOME"));
        assert!(Action::new("about").eq_ignore_case("About"));
        assert!(!Action::new("about").eq_ignore_case("abouts"));
    }

    #[test]
    fn test_controller_action_is_full() {
        assert!(ControllerAction::new("Home", "Index").is_full());
        assert!(!ControllerAction::new("", "Index").is_full());
        assert!(!ControllerAction::new("Home", "").is_full());
    }

    #[test]
    fn test_request_id_from_header() {
        let id = RequestId::new();
        let parsed = RequestId::from_header_or_new(Some(&id.to_string()));
        assert_eq!(parsed, id);
        let fresh = RequestId::from_header_or_new(Some("not-a-ulid"));
        assert_ne!(fresh, id);
    }
}
