pub mod compat;
pub mod config;
pub mod guard;
pub mod install;
pub mod logging;
pub mod parser;
pub mod version;
