mod loader;
mod prerequisite;
mod types;

pub use loader::*;
pub use prerequisite::*;
pub use types::*;
