//! Parser layer
//! - types.rs: Common types (Requirement) and requirements file detection
//! - requirements_txt.rs: requirements.txt line parser

pub mod requirements_txt;
pub mod types;

pub use requirements_txt::{full_name, normalized_name, package_name, parse_requirement};
pub use types::{Requirement, is_requirements_document, is_requirements_file};
