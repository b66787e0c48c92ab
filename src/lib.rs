#![warn(clippy::pedantic)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::str_to_string)]
#![warn(clippy::unused_trait_names)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod controller;
pub mod desktop;
pub mod names;
pub mod popup;
pub mod watcher;
