//! Terminal formatting for answers, tool activity and tool listings

pub mod formatters;

pub use formatters::{SessionFormatter, ToolFormatter};
