//! # CLI Module
//!
//! ```bash
//! # preview a views folder with static assets
//! brrtmvc serve --config brrtmvc.yaml
//!
//! # list the views a folder registers
//! brrtmvc views views/ --suffix .ghtml
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{print_views, run_cli, Cli, Commands};
