//! Language server for `requirements.txt` files
//!
//! Offers package-name completion backed by a Python package index and
//! code actions that insert pinned (`==`) or compatible-range
//! (`>=X,<X+1`) version constraints.

pub mod config;
pub mod lsp;
pub mod parser;
pub mod version;
