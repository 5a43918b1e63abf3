//! # MSSQL Read-Only MCP Server
//!
//! A Model Context Protocol (MCP) server that gives automated callers
//! read-only access to Microsoft SQL Server.
//!
//! This crate provides:
//! - **Query classification**: a deny-list classifier that admits a single
//!   `SELECT`/`WITH` query and rejects anything that could mutate data or schema
//! - **Safe execution**: classify, connect, run, render; every outcome is text
//! - **Catalog tools**: tables, columns, foreign keys and procedure source
//!
//! ## Architecture
//!
//! Caller text flows through [`security::validate`] before any I/O, then through
//! a [`database::ConnectionGateway`] (a pooled connection per call, switched to
//! the named database or back to the login database) and [`database::render`].

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod handlers;
pub mod security;
pub mod server;
pub mod tools;

pub use config::Config;
pub use error::{McpError, ServerError};
pub use server::MssqlReadOnlyServer;
