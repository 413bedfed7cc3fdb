pub mod actions;
pub mod app_switcher;
pub mod backend;
pub mod events;
pub mod wait;
