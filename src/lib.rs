pub mod ai;
pub mod bot;
pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod webhook;
