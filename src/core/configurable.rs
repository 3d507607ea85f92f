//! Configuration-conditional attribute values (`select()`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Branch taken when no condition of a `select` matches.
pub const DEFAULT_CONDITION: &str = "//conditions:default";

/// An attribute value that is either given directly or chosen per build
/// configuration:
///
/// ```toml
/// srcs = ["a.proto"]
/// deps = { select = { "//conditions:linux" = [":linux_proto"], "//conditions:default" = [] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Configurable<T> {
    Value(T),
    Select { select: BTreeMap<String, T> },
}

impl<T: Default> Default for Configurable<T> {
    fn default() -> Self {
        Configurable::Value(T::default())
    }
}

impl<T> From<T> for Configurable<T> {
    fn from(value: T) -> Self {
        Configurable::Value(value)
    }
}
