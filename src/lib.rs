//! Chat Command Bot Library
//!
//! The command-routing core of a chat bot.
//!
//! This crate provides the core functionality for:
//! - Registering command handlers by name, with an unknown-command fallback
//! - Dispatching command messages with per-command failure isolation
//! - A set of built-in commands and a JSON configuration with reload
//! - An event loop and a console transport for running the bot locally

pub mod bot;
pub mod chat;
pub mod commands;
pub mod config;
