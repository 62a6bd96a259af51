pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod middlewares;
pub mod station;
pub mod types;
pub mod widget;

pub use widget::RadioWidget;
