//! # TaskNest Shared Library
//!
//! This crate contains the domain types, persistence layer and collaborator
//! clients used by the TaskNest API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their SQL operations
//! - `store`: Owner-aware resource store (PostgreSQL and in-memory backends)
//! - `auth`: Password hashing, session identity and the ownership guard
//! - `images`: Remote image hosting (Cloudinary and an in-process mock)
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod images;
pub mod models;
pub mod store;

/// Current version of the TaskNest shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
