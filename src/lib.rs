pub mod api;
pub mod core;
pub mod logging;
pub mod store;
