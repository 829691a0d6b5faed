pub mod action_executor;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod history;
pub mod icon;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod search;
pub mod session;
pub mod ui;
