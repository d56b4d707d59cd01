pub mod config;
pub mod panes;
pub mod terminal;
