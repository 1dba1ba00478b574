//! Runtime assembly: the event dispatcher, the service manager, the
//! command engine service, and the bot client with its two run modes.

pub mod client;
pub mod command_service;
pub mod dispatcher;
pub mod error;
pub mod service;

pub use {
    client::BotClient,
    command_service::CommandService,
    dispatcher::spawn_dispatcher,
    error::{Error, Result},
    service::{Service, ServiceManager},
};
