//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `serve`         | `Serve`, `Init`                                    |
//! | `watch`         | `Watch`                                            |
//! | `sync`          | `Sync`                                             |
//! | `config`        | `Config`                                           |

pub mod config;
pub mod serve;
pub mod sync;
pub mod watch;

pub use config::cmd_config;
pub use serve::{ServeArgs, cmd_init, cmd_serve};
pub use sync::cmd_sync;
pub use watch::cmd_watch;
