//! # Index Database Crate
//!
//! This crate is the PostgreSQL archive for the index tracker: raw price
//! observations on the way in, and completed index runs on the way out.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The engine only ever sees a fully
//!   materialized `InMemoryPriceStore`, never the database.
//! - **Runtime Queries:** Queries are built with `sqlx::query` and bound at
//!   runtime, so the workspace builds without a live database.
//! - **Asynchronous & Pooled:** All operations are asynchronous and share a
//!   connection pool (`PgPool`).
//!
//! ## Public API
//!
//! - `connect`: establishes the database connection pool.
//! - `run_migrations`: applies the embedded schema migrations.
//! - `DbRepository`: the data access methods.
//! - `DbError`: the errors this crate can return.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::DbRepository;
