//! Content resolver implementations for oscfg.

pub mod inline;
pub mod in_memory;
pub mod secret_dir;

pub use inline::{decode_inline, InlineResolver};
pub use in_memory::InMemorySecrets;
pub use secret_dir::SecretDirResolver;
