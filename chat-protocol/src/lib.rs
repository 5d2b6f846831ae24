//! The chat-over-TXT protocol: control commands, query validation, model
//! catalog and reply sanitizing. Nothing in here does I/O.

mod catalog;
mod sanitize;
mod validate;

pub use catalog::{ModelCatalog, OutOfRange, LISTING_PREFIX, MAX_CATALOG_SIZE};
pub use sanitize::{sanitize, MAX_REPLY_LENGTH};
pub use validate::{
    check_auth, check_format, check_model, check_prompt, validate, ChatRequest, Rejection,
    ValidatedChat, ValidationContext, KEY_LENGTH, MIN_QUERY_LENGTH,
};

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const LIST: &str = "LIST";

/// Prefix of every failure reply.
pub const ERROR_PREFIX: &str = "ERROR:";

/// Unauthenticated commands answered before any validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ControlCommand {
    Ping,
    List,
}

impl ControlCommand {
    pub fn parse(query: &str) -> Option<Self> {
        match query {
            PING => Some(ControlCommand::Ping),
            LIST => Some(ControlCommand::List),
            _ => None,
        }
    }

    pub fn reply(&self, catalog: &ModelCatalog) -> String {
        match self {
            ControlCommand::Ping => PONG.to_string(),
            ControlCommand::List => catalog.listing(),
        }
    }
}

pub fn is_error_reply(reply: &str) -> bool {
    reply.starts_with(ERROR_PREFIX)
}
