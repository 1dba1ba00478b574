//! Command declarations: parameters, options, option groups, and the
//! handler binding.

use std::{collections::BTreeMap, sync::Arc};

use futures::future::BoxFuture;

use kotori_protocol::Event;

use crate::filter::Filter;

/// Declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Int,
    Float,
    Bool,
}

impl ParamKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }
}

/// A bound argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Variadic tail: the leftover positional elements.
    List(Vec<String>),
}

impl ArgValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A positional-or-named parameter declaration.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<ArgValue>,
    /// Allowed string values; empty means unrestricted.
    pub choices: Vec<String>,
}

impl ParamSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn choices(mut self, choices: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}

/// A boolean flag with a short and/or long form.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    /// The name the flag binds under.
    pub name: String,
    pub short: Option<char>,
    pub long: Option<String>,
}

impl OptionSpec {
    #[must_use]
    pub fn short(name: impl Into<String>, letter: char) -> Self {
        Self {
            name: name.into(),
            short: Some(letter),
            long: None,
        }
    }

    #[must_use]
    pub fn long(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            long: Some(name.clone()),
            name,
            short: None,
        }
    }

    #[must_use]
    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }
}

/// Mutually exclusive long flags, of which at most one may be set.
#[derive(Debug, Clone)]
pub struct OptionGroup {
    /// The name the chosen member binds under.
    pub name: String,
    pub members: Vec<String>,
    pub default: String,
}

impl OptionGroup {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }
}

/// Everything a handler receives for one invocation.
#[derive(Debug, Clone)]
pub struct CommandCall {
    pub event: Arc<Event>,
    pub args: crate::binder::BoundArgs,
}

/// The handler function bound to a command.
pub type Handler = Arc<dyn Fn(CommandCall) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(CommandCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |call| Box::pin(f(call)))
}

/// One registered command.
#[derive(Clone)]
pub struct CommandSpec {
    /// Joined path words, for diagnostics.
    pub name: String,
    /// The words identifying this command; never empty.
    pub path: Vec<String>,
    /// Alternative paths resolving to the same handler.
    pub aliases: Vec<Vec<String>>,
    /// Accepted prefixes; the empty string means "no prefix".
    pub prefixes: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub options: Vec<OptionSpec>,
    pub groups: Vec<OptionGroup>,
    /// Name to bind leftover positional elements under, when declared.
    pub rest: Option<String>,
    pub filter: Option<Filter>,
    /// Owning plugin, for bulk revocation on unload.
    pub owner: Option<String>,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("aliases", &self.aliases)
            .field("prefixes", &self.prefixes)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl CommandSpec {
    /// Start building a command from space-separated path words.
    #[must_use]
    pub fn builder(path: &str) -> CommandBuilder {
        CommandBuilder {
            path: path.split_whitespace().map(str::to_string).collect(),
            aliases: Vec::new(),
            prefixes: vec!["/".to_string()],
            params: Vec::new(),
            options: Vec::new(),
            groups: Vec::new(),
            rest: None,
            filter: None,
            owner: None,
        }
    }

    /// The option names this spec declares, with their default `false`.
    #[must_use]
    pub fn declared_options(&self) -> BTreeMap<String, bool> {
        self.options
            .iter()
            .map(|o| (o.name.clone(), false))
            .collect()
    }
}

pub struct CommandBuilder {
    path: Vec<String>,
    aliases: Vec<Vec<String>>,
    prefixes: Vec<String>,
    params: Vec<ParamSpec>,
    options: Vec<OptionSpec>,
    groups: Vec<OptionGroup>,
    rest: Option<String>,
    filter: Option<Filter>,
    owner: Option<String>,
}

impl CommandBuilder {
    #[must_use]
    pub fn alias(mut self, path: &str) -> Self {
        self.aliases
            .push(path.split_whitespace().map(str::to_string).collect());
        self
    }

    /// Replace the default `/` prefix set.
    #[must_use]
    pub fn prefixes(mut self, prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    #[must_use]
    pub fn group(mut self, group: OptionGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Collect leftover positional elements under `name`.
    #[must_use]
    pub fn rest(mut self, name: impl Into<String>) -> Self {
        self.rest = Some(name.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn build(self, handler: Handler) -> crate::Result<CommandSpec> {
        if self.path.is_empty() {
            return Err(crate::Error::InvalidSpec(
                "command path must contain at least one word".into(),
            ));
        }
        for group in &self.groups {
            if !group.members.contains(&group.default) {
                return Err(crate::Error::InvalidSpec(format!(
                    "option group '{}' default '{}' is not a member",
                    group.name, group.default
                )));
            }
        }
        Ok(CommandSpec {
            name: self.path.join(" "),
            path: self.path,
            aliases: self.aliases,
            prefixes: self.prefixes,
            params: self.params,
            options: self.options,
            groups: self.groups,
            rest: self.rest,
            filter: self.filter,
            owner: self.owner,
            handler,
        })
    }
}
