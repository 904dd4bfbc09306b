//! LSP (Language Server Protocol) implementation layer
//!
//! This module handles communication with editors via LSP and provides
//! package completion and version code actions for requirements files.
//!
//! # Modules
//!
//! - [`backend`]: Main LSP backend implementing `LanguageServer` trait
//! - [`code_action`]: Auto and prompted version code actions
//! - [`commands`]: `workspace/executeCommand` commands
//! - [`completion`]: Package name and release completion
//! - [`document`]: Open document store
//! - [`server`]: LSP server initialization and lifecycle

pub mod backend;
pub mod code_action;
pub mod commands;
pub mod completion;
pub mod document;
pub mod server;
