use std::error::Error as StdError;
use std::fmt;

mod dom;
mod duration;
mod html;
mod layout;
mod page;
mod schedule;
mod selector;
mod timers;
mod widgets;

#[cfg(test)]
mod tests;

pub use duration::{format_duration, from_legacy_format, hour_word};
pub use layout::DeviceCategory;
pub use page::Page;
pub use schedule::PendingTimer;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    UnsupportedSelector(String),
    SelectorNotFound(String),
    Dom(String),
    Scheduler(String),
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
            Self::Scheduler(msg) => write!(f, "scheduler error: {msg}"),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}
