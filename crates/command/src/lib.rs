//! Command trigger engine.
//!
//! Turns chat text into typed function invocations: the lexer splits text
//! into tokens, the resolver matches a registered command by prefix and
//! path words, the filter chain gates on event shape and RBAC, and the
//! binder maps the remaining tokens onto declared parameters.

pub mod binder;
pub mod engine;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod spec;

pub use {
    binder::{BindError, BoundArgs, bind},
    engine::{CommandEngine, Dispatch},
    error::{Error, Result},
    filter::Filter,
    lexer::{Token, TokenKind, tokenize},
    parser::{Element, ParsedCommand, parse},
    registry::CommandRegistry,
    resolver::{CommandIndex, Resolved},
    spec::{ArgValue, CommandCall, CommandSpec, Handler, OptionGroup, OptionSpec, ParamKind, ParamSpec},
};
