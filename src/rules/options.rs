//! Recognized options per rule kind, and typed access to option values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::configurable::Configurable;
use crate::core::label::RelativeLabel;
use crate::core::TargetId;
use crate::evaluation::context::InvocationContext;
use crate::evaluation::errors::EvalError;
use crate::evaluation::state::EvaluationState;
use crate::rules::proto::{proto_lang_toolchain, proto_library};
use crate::util::diagnostic::Diagnostic;

/// Raw options of one rule invocation, keyed by option name.
pub type Attributes = BTreeMap<String, Value>;

/// Declares one invocation of a rule kind in the given package.
pub type DeclareFn = fn(
    &mut EvaluationState,
    &InvocationContext,
    &str,
    &Attributes,
) -> Result<TargetId, EvalError>;

/// The option table of one rule kind, and how it is declared.
#[derive(Debug, Clone, Copy)]
pub struct RuleSchema {
    pub kind: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub declare: DeclareFn,
}

impl PartialEq for RuleSchema {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for RuleSchema {}

pub const PROTO_LIBRARY: RuleSchema = RuleSchema {
    kind: "proto_library",
    required: &[],
    optional: &[
        "srcs",
        "deps",
        "strip_import_prefix",
        "import_prefix",
        "visibility",
        "tags",
        "testonly",
    ],
    declare: proto_library,
};

pub const PROTO_LANG_TOOLCHAIN: RuleSchema = RuleSchema {
    kind: "proto_lang_toolchain",
    required: &["command_line", "runtime"],
    optional: &["visibility", "tags"],
    declare: proto_lang_toolchain,
};

const SCHEMAS: &[RuleSchema] = &[PROTO_LIBRARY, PROTO_LANG_TOOLCHAIN];

/// The option table for `kind`, if it is a known rule kind.
pub fn schema_for(kind: &str) -> Option<&'static RuleSchema> {
    SCHEMAS.iter().find(|schema| schema.kind == kind)
}

/// Every supported rule kind, comma separated.
pub fn supported_kinds() -> String {
    SCHEMAS.iter().map(|schema| schema.kind).collect::<Vec<_>>().join(", ")
}

impl RuleSchema {
    pub fn recognizes(&self, option: &str) -> bool {
        self.required.contains(&option) || self.optional.contains(&option)
    }

    /// Check `attrs` against this table. Missing required options are
    /// fatal; unrecognized ones come back as warnings.
    pub fn check(&self, target: &TargetId, attrs: &Attributes) -> Result<Vec<Diagnostic>, EvalError> {
        if let Some(missing) = self.required.iter().find(|r| !attrs.contains_key(**r)) {
            return Err(EvalError::MissingAttribute {
                target: target.clone(),
                attribute: missing.to_string(),
            });
        }

        Ok(attrs
            .keys()
            .filter(|option| !self.recognizes(option))
            .map(|option| {
                Diagnostic::warning(format!(
                    "{} does not recognize option `{}`; it is ignored",
                    self.kind, option
                ))
                .for_target(target)
                .with_suggestion(format!("recognized options: {}", self.option_names()))
            })
            .collect())
    }

    fn option_names(&self) -> String {
        let mut names: Vec<&str> = self.required.iter().chain(self.optional).copied().collect();
        names.sort_unstable();
        names.join(", ")
    }
}

/// A string option. Absent and `null` mean unset.
pub fn string_attr(
    target: &TargetId,
    attrs: &Attributes,
    name: &str,
) -> Result<Option<String>, EvalError> {
    match attrs.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(target, name, "a string")),
    }
}

/// A plain list of labels.
pub fn label_list_attr(
    target: &TargetId,
    attrs: &Attributes,
    name: &str,
) -> Result<Vec<RelativeLabel>, EvalError> {
    match attrs.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|_| invalid(target, name, "a list of labels")),
    }
}

/// A list of labels that may be wrapped in a `select`.
pub fn configurable_label_list_attr(
    target: &TargetId,
    attrs: &Attributes,
    name: &str,
) -> Result<Configurable<Vec<RelativeLabel>>, EvalError> {
    match attrs.get(name) {
        None | Some(Value::Null) => Ok(Configurable::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|_| invalid(target, name, "a list of labels or a select")),
    }
}

fn invalid(target: &TargetId, attribute: &str, expected: &'static str) -> EvalError {
    EvalError::InvalidAttribute {
        target: target.clone(),
        attribute: attribute.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn target() -> TargetId {
        TargetId::new("main", "pkg", "lib")
    }

    fn attrs(value: Value) -> Attributes {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_schema_lookup() {
        assert_eq!(schema_for("proto_library"), Some(&PROTO_LIBRARY));
        assert!(schema_for("cc_library").is_none());
        assert_eq!(supported_kinds(), "proto_library, proto_lang_toolchain");
    }

    #[test]
    fn test_unrecognized_options_are_warnings() {
        let attrs = attrs(json!({ "srcs": [], "copts": ["-O2"], "linkstatic": true }));
        let warnings = PROTO_LIBRARY.check(&target(), &attrs).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("`copts`"));
        assert!(warnings[1].message.contains("`linkstatic`"));
        assert_eq!(warnings[0].target, Some(target()));
    }

    #[test]
    fn test_missing_required_option() {
        let attrs = attrs(json!({ "command_line": "--cpp_out=$(OUT)" }));
        let err = PROTO_LANG_TOOLCHAIN.check(&target(), &attrs).unwrap_err();
        assert!(matches!(err, EvalError::MissingAttribute { attribute, .. } if attribute == "runtime"));
    }

    #[test]
    fn test_typed_getters() {
        let attrs = attrs(json!({
            "strip_import_prefix": "/pkg",
            "import_prefix": 3,
            "srcs": ["a.proto"],
            "deps": { "select": { "//conditions:default": [":x"] } },
            "visibility": "//visibility:public",
        }));

        assert_eq!(
            string_attr(&target(), &attrs, "strip_import_prefix").unwrap(),
            Some("/pkg".to_string())
        );
        assert!(string_attr(&target(), &attrs, "missing").unwrap().is_none());
        assert!(matches!(
            string_attr(&target(), &attrs, "import_prefix"),
            Err(EvalError::InvalidAttribute { expected: "a string", .. })
        ));

        assert_eq!(
            configurable_label_list_attr(&target(), &attrs, "srcs").unwrap(),
            Configurable::Value(vec![RelativeLabel::new("a.proto")])
        );
        assert!(matches!(
            configurable_label_list_attr(&target(), &attrs, "deps").unwrap(),
            Configurable::Select { .. }
        ));
        assert!(label_list_attr(&target(), &attrs, "visibility").is_err());
    }
}
