pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod ini;
pub mod options;
pub mod output;
pub mod profile;
pub mod references;
pub mod resolver;
pub mod simulator;
pub mod tools;
