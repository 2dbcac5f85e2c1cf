//! Library surface behind the `jald` binary, exposed so integration tests
//! can drive the daemon's startup sequence without going through `main`.

pub mod acceptor;
pub mod cli;
pub mod config;
pub mod daemonize;
pub mod shutdown;
pub mod threadcount;

pub use config::load_config;
