//! Library path naming: pattern resolution, sanitization and collisions.

mod collision;
mod pattern;
mod sanitize;
mod variables;

pub use collision::{resolve_batch, resolve_batch_with, unique_path, Slot};
pub use pattern::{
    apply_pattern, batch_pattern, file_name_pattern, resolve, resolve_file_name, DEFAULT_PATTERN,
    MULTI_FILE_NAME,
};
pub use sanitize::sanitize_component;
pub use variables::{choose_author, split_author_title, NamingVariables};
