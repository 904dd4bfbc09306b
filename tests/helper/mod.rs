#[allow(dead_code)]
mod lsp;
mod registry;

pub use lsp::*;
pub use registry::*;
