//! Command Handler Module
//!
//! Maps a decoded [`Frame`] to its handler, validates the argument shape and
//! produces the typed reply.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value [PX milliseconds]` - Set a key, optionally with a TTL
//! - `GET key` - Get a key's value
//! - `CONFIG GET parameter` - Read a runtime parameter (`dir`, `dbfilename`)
//! - `CONFIG SET parameter value` - Change a runtime parameter
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  execute()  │───>│  dispatch() │───>│  cmd_*()    │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               │             │
//! │                              ┌────────────────┴──────┐      │
//! │                              ▼                       ▼      │
//! │                       StorageEngine           RuntimeConfig │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `cmd_*` returns `Result<RespValue, CommandError>`. Errors are
//! encoded as `-ERR` replies by `execute()`; they never end the connection.

use crate::config::{ConfigParam, RuntimeConfig, UnknownParam};
use crate::protocol::{Frame, RespValue};
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Recoverable errors reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("value is not an integer or out of range")]
    NotAnInteger,

    #[error("syntax error")]
    Syntax,

    #[error("unknown subcommand '{0}'")]
    UnknownSubcommand(String),

    #[error(transparent)]
    UnknownConfigParam(#[from] UnknownParam),
}

type CommandResult = Result<RespValue, CommandError>;

/// Executes commands against the shared keyspace and runtime configuration.
///
/// Cloning is cheap; each connection gets its own clone.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    config: Arc<RuntimeConfig>,
}

impl CommandHandler {
    /// Creates a new command handler over the given shared resources.
    pub fn new(storage: Arc<StorageEngine>, config: Arc<RuntimeConfig>) -> Self {
        Self { storage, config }
    }

    /// Executes a command and returns the reply to send back.
    pub fn execute(&self, frame: Frame) -> RespValue {
        match self.dispatch(&frame.name, &frame.args) {
            Ok(reply) => reply,
            Err(e) => RespValue::error(e.to_string()),
        }
    }

    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> CommandResult {
        match cmd {
            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "CONFIG" => self.cmd_config(args),
            _ => Err(CommandError::UnknownCommand(cmd.to_string())),
        }
    }

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [] => Ok(RespValue::pong()),
            [msg] => Ok(RespValue::bulk_string(msg.clone())),
            _ => Err(CommandError::WrongArity("ping")),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [msg] => Ok(RespValue::bulk_string(msg.clone())),
            _ => Err(CommandError::WrongArity("echo")),
        }
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[Bytes]) -> CommandResult {
        let (key, value, options) = match args {
            [key, value, options @ ..] => (key, value, options),
            _ => return Err(CommandError::WrongArity("set")),
        };

        let mut ttl = None;
        let mut options = options.iter();
        while let Some(opt) = options.next() {
            if !opt.eq_ignore_ascii_case(b"PX") {
                return Err(CommandError::Syntax);
            }
            let ms = options.next().ok_or(CommandError::Syntax)?;
            ttl = Some(ttl_from_millis(parse_i64(ms)?));
        }

        self.storage.set(key.clone(), value.clone(), ttl);
        Ok(RespValue::ok())
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("get"));
        };

        Ok(match self.storage.get(key) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        })
    }

    /// CONFIG GET parameter | CONFIG SET parameter value
    fn cmd_config(&self, args: &[Bytes]) -> CommandResult {
        let Some((subcommand, rest)) = args.split_first() else {
            return Err(CommandError::WrongArity("config"));
        };

        if subcommand.eq_ignore_ascii_case(b"GET") {
            let [name] = rest else {
                return Err(CommandError::WrongArity("config|get"));
            };
            let param = parse_param(name)?;
            Ok(RespValue::array(vec![
                Bytes::from_static(param.name().as_bytes()),
                self.config.get(param),
            ]))
        } else if subcommand.eq_ignore_ascii_case(b"SET") {
            let [name, value] = rest else {
                return Err(CommandError::WrongArity("config|set"));
            };
            let param = parse_param(name)?;
            self.config.set(param, value.clone());
            Ok(RespValue::ok())
        } else {
            Err(CommandError::UnknownSubcommand(
                String::from_utf8_lossy(subcommand).into_owned(),
            ))
        }
    }
}

fn parse_i64(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotAnInteger)
}

fn parse_param(arg: &[u8]) -> Result<ConfigParam, CommandError> {
    Ok(String::from_utf8_lossy(arg).parse::<ConfigParam>()?)
}

/// Non-positive TTLs collapse to zero, which expires on the next read.
fn ttl_from_millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        let config = Arc::new(RuntimeConfig::new("/var/lib/sparkkv", "dump.rdb"));
        CommandHandler::new(storage, config)
    }

    fn make_command(args: &[&str]) -> Frame {
        Frame::new(
            args[0],
            args[1..]
                .iter()
                .map(|s| Bytes::from(s.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["PING"]));
        assert_eq!(response, RespValue::simple_string("PONG"));

        let response = handler.execute(make_command(&["ping", "hello"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("hello")));
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["ECHO", "Hello World"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("Hello World")));

        let response = handler.execute(make_command(&["ECHO"]));
        assert_eq!(
            response.serialize(),
            b"-ERR wrong number of arguments for 'echo' command\r\n"
        );
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value"]));
        assert_eq!(response, RespValue::ok());

        let response = handler.execute(make_command(&["GET", "key"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["GET", "nonexistent"]));
        assert_eq!(response, RespValue::null());
    }

    #[test]
    fn test_set_and_get_arity() {
        let handler = create_handler();

        assert_eq!(
            handler.execute(make_command(&["SET", "key"])),
            RespValue::error("wrong number of arguments for 'set' command")
        );
        assert_eq!(
            handler.execute(make_command(&["GET"])),
            RespValue::error("wrong number of arguments for 'get' command")
        );
        assert!(handler.execute(make_command(&["GET", "a", "b"])).is_error());
    }

    #[test]
    fn test_set_px_expires() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value", "px", "30"]));
        assert_eq!(response, RespValue::ok());
        assert_eq!(
            handler.execute(make_command(&["GET", "key"])),
            RespValue::bulk_string(Bytes::from("value"))
        );

        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(handler.execute(make_command(&["GET", "key"])), RespValue::null());
    }

    #[test]
    fn test_set_non_positive_px_expires_immediately() {
        let handler = create_handler();

        for ms in ["0", "-5"] {
            let response = handler.execute(make_command(&["SET", "key", "value", "PX", ms]));
            assert_eq!(response, RespValue::ok());
            assert_eq!(handler.execute(make_command(&["GET", "key"])), RespValue::null());
        }
    }

    #[test]
    fn test_set_malformed_px() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value", "PX", "soon"]));
        assert_eq!(
            response,
            RespValue::error("value is not an integer or out of range")
        );
        // Rejected before any write
        assert_eq!(handler.execute(make_command(&["GET", "key"])), RespValue::null());

        let response = handler.execute(make_command(&["SET", "key", "value", "PX"]));
        assert_eq!(response, RespValue::error("syntax error"));
    }

    #[test]
    fn test_set_unknown_option_rejected() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value", "NX"]));
        assert_eq!(response, RespValue::error("syntax error"));
    }

    #[test]
    fn test_set_clears_previous_ttl() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "key", "old", "PX", "20"]));
        handler.execute(make_command(&["SET", "key", "new"]));

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(
            handler.execute(make_command(&["GET", "key"])),
            RespValue::bulk_string(Bytes::from("new"))
        );
    }

    #[test]
    fn test_config_get_set() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["CONFIG", "GET", "dbfilename"]));
        assert_eq!(
            response,
            RespValue::array(vec![Bytes::from("dbfilename"), Bytes::from("dump.rdb")])
        );

        let response = handler.execute(make_command(&["CONFIG", "SET", "dir", "/tmp"]));
        assert_eq!(response, RespValue::ok());

        let response = handler.execute(make_command(&["config", "get", "DIR"]));
        assert_eq!(
            response.serialize(),
            b"*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n"
        );
    }

    #[test]
    fn test_config_set_binary_value() {
        let handler = create_handler();
        let raw = Bytes::from_static(b"dump\xff.rdb");

        let frame = Frame::new(
            "CONFIG",
            vec![Bytes::from("SET"), Bytes::from("dbfilename"), raw.clone()],
        );
        assert_eq!(handler.execute(frame), RespValue::ok());

        let response = handler.execute(make_command(&["CONFIG", "GET", "dbfilename"]));
        assert_eq!(
            response,
            RespValue::array(vec![Bytes::from("dbfilename"), raw])
        );
    }

    #[test]
    fn test_config_errors() {
        let handler = create_handler();

        assert_eq!(
            handler.execute(make_command(&["CONFIG", "GET", "maxmemory"])),
            RespValue::error("unknown config parameter 'maxmemory'")
        );
        assert_eq!(
            handler.execute(make_command(&["CONFIG", "SET", "port", "1"])),
            RespValue::error("unknown config parameter 'port'")
        );
        assert_eq!(
            handler.execute(make_command(&["CONFIG", "RESETSTAT"])),
            RespValue::error("unknown subcommand 'RESETSTAT'")
        );
        assert!(handler.execute(make_command(&["CONFIG"])).is_error());
        assert!(handler.execute(make_command(&["CONFIG", "SET", "dir"])).is_error());
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["foo", "bar"]));
        assert_eq!(response.serialize(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_handlers_share_state() {
        let storage = Arc::new(StorageEngine::new());
        let config = Arc::new(RuntimeConfig::default());
        let first = CommandHandler::new(Arc::clone(&storage), Arc::clone(&config));
        let second = first.clone();

        first.execute(make_command(&["SET", "shared", "1"]));
        first.execute(make_command(&["CONFIG", "SET", "dir", "/srv"]));

        assert_eq!(
            second.execute(make_command(&["GET", "shared"])),
            RespValue::bulk_string(Bytes::from("1"))
        );
        assert_eq!(config.get(ConfigParam::Dir), "/srv");
    }
}
