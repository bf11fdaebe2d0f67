//! pagebridge library exports for testing

use clap::ValueEnum;

pub mod channel;
pub mod core;
pub mod host;

#[cfg(test)]
pub mod test_support;

/// How a bridge begins its handshake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StartMode {
    /// Both engines load resources.
    #[default]
    Full,
    /// No logic engine participates; its side counts as loaded.
    WithoutLogic,
}
