pub mod api;
pub mod config;
pub mod dashboard;
pub mod dom;
pub mod forms;
pub mod html;
pub mod logging;
pub mod traffic;
pub mod widget;
pub mod widgets;
