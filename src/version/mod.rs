//! Version management layer for requirement lines
//!
//! Fetches package names and release lists from a Python package index,
//! caches them with a TTL, orders releases and formats constraints.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ PackageIndex │────▶│   Catalog   │────▶│  Formatter  │
//! │   (fetch)    │     │ (TTL cache) │     │ (==, >=,<)  │
//! └──────────────┘     └─────────────┘     └─────────────┘
//!        │                    │
//!        ▼                    ▼
//! ┌──────────────┐     ┌─────────────┐
//! │  Registries  │     │  Ordering   │
//! │    (PyPI)    │     │ (sort key)  │
//! └──────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: In-memory TTL cache
//! - [`catalog`]: Cached package list and release lookups
//! - [`error`]: Error types for index operations
//! - [`formatter`]: Strict and compatible-range constraint formatting
//! - [`ordering`]: Release ordering key
//! - [`registry`]: Package index trait
//! - [`registries`]: Concrete index implementations

pub mod cache;
pub mod catalog;
pub mod error;
pub mod formatter;
pub mod ordering;
pub mod registries;
pub mod registry;
