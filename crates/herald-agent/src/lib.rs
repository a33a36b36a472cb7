//! Herald agent: startup glue around the playback core.
//!
//! Loads configuration, decides what to say when members join the watched
//! channel, and wires the coordinator and connection manager together. The
//! binary drives everything from a line console over the loopback platform.

pub mod app;
pub mod config;
pub mod console;
pub mod greeting;
pub mod presence;

pub use app::{Agent, AgentError};
pub use config::{load_config, Config, ConfigError};
pub use console::{parse_line, ConsoleCommand, ConsoleError};
pub use greeting::GreetingConfig;
pub use presence::PresenceWatcher;
