//! Parameter binder: maps partitioned tokens onto a command's declared
//! parameters, options, and option groups.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    parser::ParsedCommand,
    spec::{ArgValue, CommandSpec, ParamKind, ParamSpec},
};

/// A failed binding. These are published as a bind-failure event by the
/// engine, never raised into handlers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindError {
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("parameter '{name}' expects {expected}, got '{value}'")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("parameter '{name}' must be one of [{}], got '{value}'", allowed.join(", "))]
    InvalidChoice {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("options '--{first}' and '--{second}' of group '{group}' are mutually exclusive")]
    GroupConflict {
        group: String,
        first: String,
        second: String,
    },
}

/// The bound argument set handed to a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    /// Declared options (defaulted to `false`) overlaid with every raw flag
    /// that appeared in the message.
    pub options: BTreeMap<String, bool>,
    /// Parameter and option-group values by name.
    pub values: BTreeMap<String, ArgValue>,
}

impl BoundArgs {
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.options.get(name).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }
}

/// Bind `parsed` tokens against `spec`, skipping the first `skip` positional
/// elements (the matched path words).
pub fn bind(
    spec: &CommandSpec,
    parsed: &ParsedCommand,
    skip: usize,
) -> Result<BoundArgs, BindError> {
    let mut out = BoundArgs::default();

    // Declared options default to false; raw flags overlay on top, so a
    // handler also sees undeclared flags the user typed.
    out.options = spec.declared_options();
    for spec_option in &spec.options {
        let set = spec_option
            .short
            .is_some_and(|c| parsed.options.contains_key(&c.to_string()))
            || spec_option
                .long
                .as_ref()
                .is_some_and(|l| parsed.options.contains_key(l));
        if set {
            out.options.insert(spec_option.name.clone(), true);
        }
    }
    for (flag, value) in &parsed.options {
        out.options.entry(flag.clone()).or_insert(*value);
    }

    // Option groups: at most one member may be set; none means the default.
    for group in &spec.groups {
        let mut chosen: Option<&str> = None;
        for member in &group.members {
            if parsed.options.get(member).copied().unwrap_or(false) {
                if let Some(first) = chosen {
                    return Err(BindError::GroupConflict {
                        group: group.name.clone(),
                        first: first.to_string(),
                        second: member.clone(),
                    });
                }
                chosen = Some(member);
            }
        }
        let value = chosen.unwrap_or(&group.default).to_string();
        out.values.insert(group.name.clone(), ArgValue::Str(value));
    }

    // Parameters: named wins, then the next positional, then the default.
    let mut positionals = parsed.elements.iter().skip(skip).map(|e| &e.content);
    for param in &spec.params {
        let bound = if let Some(raw) = parsed.named.get(&param.name) {
            Some(convert(param, raw)?)
        } else if let Some(raw) = positionals.next() {
            Some(convert(param, raw)?)
        } else {
            param.default.clone()
        };

        match bound {
            Some(value) => {
                out.values.insert(param.name.clone(), value);
            },
            None => {
                return Err(BindError::MissingParameter {
                    name: param.name.clone(),
                });
            },
        }
    }

    // Leftover positionals: variadic tail when declared, ignored otherwise.
    let leftover: Vec<String> = positionals.cloned().collect();
    if let Some(rest) = &spec.rest {
        out.values.insert(rest.clone(), ArgValue::List(leftover));
    } else if !leftover.is_empty() {
        tracing::debug!(command = %spec.name, count = leftover.len(), "ignoring extra positional elements");
    }

    Ok(out)
}

/// Convert a raw string to the declared type and validate choices.
fn convert(param: &ParamSpec, raw: &str) -> Result<ArgValue, BindError> {
    if !param.choices.is_empty() && !param.choices.iter().any(|c| c == raw) {
        return Err(BindError::InvalidChoice {
            name: param.name.clone(),
            value: raw.to_string(),
            allowed: param.choices.clone(),
        });
    }

    match param.kind {
        ParamKind::String => Ok(ArgValue::Str(raw.to_string())),
        ParamKind::Int => raw
            .parse()
            .map(ArgValue::Int)
            .map_err(|_| BindError::TypeMismatch {
                name: param.name.clone(),
                expected: "int",
                value: raw.to_string(),
            }),
        ParamKind::Float => raw
            .parse()
            .map(ArgValue::Float)
            .map_err(|_| BindError::TypeMismatch {
                name: param.name.clone(),
                expected: "float",
                value: raw.to_string(),
            }),
        ParamKind::Bool => match raw {
            "true" | "1" => Ok(ArgValue::Bool(true)),
            "false" | "0" => Ok(ArgValue::Bool(false)),
            _ => Err(BindError::TypeMismatch {
                name: param.name.clone(),
                expected: "bool",
                value: raw.to_string(),
            }),
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            lexer::tokenize,
            parser::parse,
            spec::{CommandSpec, OptionGroup, OptionSpec, ParamSpec, handler},
        },
    };

    fn backup_spec() -> CommandSpec {
        CommandSpec::builder("backup")
            .param(ParamSpec::new("source", ParamKind::String))
            .param(
                ParamSpec::new("dest", ParamKind::String)
                    .default_value(ArgValue::Str("/tmp".into())),
            )
            .option(OptionSpec::short("v", 'v'))
            .option(OptionSpec::long("force"))
            .build(handler(|_| async { Ok(()) }))
            .unwrap()
    }

    fn bind_text(spec: &CommandSpec, text: &str, skip: usize) -> Result<BoundArgs, BindError> {
        bind(spec, &parse(&tokenize(text)), skip)
    }

    #[test]
    fn mixed_token_binding() {
        // `/backup "my files" --dest=/bak -vf` with the prefix+word stripped.
        let args = bind_text(&backup_spec(), r#"backup "my files" --dest=/bak -vf"#, 1).unwrap();

        assert_eq!(args.get("source").unwrap().as_str(), Some("my files"));
        assert_eq!(args.get("dest").unwrap().as_str(), Some("/bak"));
        assert!(args.flag("v"));
        assert!(args.flag("f"));
        assert!(!args.flag("force"));
    }

    #[test]
    fn defaults_fill_missing_parameters() {
        let args = bind_text(&backup_spec(), "backup /data", 1).unwrap();
        assert_eq!(args.get("source").unwrap().as_str(), Some("/data"));
        assert_eq!(args.get("dest").unwrap().as_str(), Some("/tmp"));
    }

    #[test]
    fn missing_required_parameter_is_an_error() {
        let err = bind_text(&backup_spec(), "backup", 1).unwrap_err();
        assert_eq!(
            err,
            BindError::MissingParameter {
                name: "source".into()
            }
        );
    }

    #[test]
    fn named_parameters_win_over_positionals() {
        let spec = CommandSpec::builder("greet")
            .param(ParamSpec::new("who", ParamKind::String))
            .build(handler(|_| async { Ok(()) }))
            .unwrap();
        let args = bind_text(&spec, "greet --who=alice bob", 1).unwrap();
        // 'bob' stays positional and is ignored; the named value binds.
        assert_eq!(args.get("who").unwrap().as_str(), Some("alice"));
    }

    #[test]
    fn typed_conversion_and_errors() {
        let spec = CommandSpec::builder("resize")
            .param(ParamSpec::new("width", ParamKind::Int))
            .param(ParamSpec::new("scale", ParamKind::Float))
            .param(ParamSpec::new("keep", ParamKind::Bool))
            .build(handler(|_| async { Ok(()) }))
            .unwrap();

        let args = bind_text(&spec, "resize 800 1.5 true", 1).unwrap();
        assert_eq!(args.get("width").unwrap().as_int(), Some(800));
        assert_eq!(args.get("keep").unwrap().as_bool(), Some(true));

        let args = bind_text(&spec, "resize 800 1.5 0", 1).unwrap();
        assert_eq!(args.get("keep").unwrap().as_bool(), Some(false));

        let err = bind_text(&spec, "resize eight 1.5 true", 1).unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { expected: "int", .. }));

        let err = bind_text(&spec, "resize 800 1.5 maybe", 1).unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { expected: "bool", .. }));
    }

    #[test]
    fn choices_are_validated() {
        let spec = CommandSpec::builder("deploy")
            .param(ParamSpec::new("env", ParamKind::String).choices(["dev", "prod"]))
            .build(handler(|_| async { Ok(()) }))
            .unwrap();

        assert!(bind_text(&spec, "deploy prod", 1).is_ok());
        let err = bind_text(&spec, "deploy staging", 1).unwrap_err();
        assert!(matches!(err, BindError::InvalidChoice { .. }));
    }

    #[test]
    fn option_groups_enforce_exclusivity() {
        let spec = CommandSpec::builder("run")
            .group(OptionGroup::new("mode", ["fast", "normal", "safe"], "normal"))
            .build(handler(|_| async { Ok(()) }))
            .unwrap();

        let args = bind_text(&spec, "run --fast", 1).unwrap();
        assert_eq!(args.get("mode").unwrap().as_str(), Some("fast"));

        let args = bind_text(&spec, "run", 1).unwrap();
        assert_eq!(args.get("mode").unwrap().as_str(), Some("normal"));

        let err = bind_text(&spec, "run --fast --safe", 1).unwrap_err();
        assert!(matches!(err, BindError::GroupConflict { .. }));
    }

    #[test]
    fn variadic_tail_collects_leftovers() {
        let spec = CommandSpec::builder("rm")
            .param(ParamSpec::new("first", ParamKind::String))
            .rest("others")
            .build(handler(|_| async { Ok(()) }))
            .unwrap();

        let args = bind_text(&spec, "rm a b c", 1).unwrap();
        assert_eq!(args.get("first").unwrap().as_str(), Some("a"));
        assert_eq!(
            args.get("others"),
            Some(&ArgValue::List(vec!["b".into(), "c".into()]))
        );
    }
}
