//! Path-component validation.
//!
//! Every caller-supplied name (board, section, filename, username) passes
//! through here before any path is built, so traversal checks live in one
//! place instead of per endpoint.

use domains::{Error, Result};

/// Accepts a name that is safe to join onto the data root as one path
/// component. Empty names, dot entries, anything containing `..`, and
/// separator or NUL bytes are rejected.
pub(crate) fn validate_component(name: &str) -> Result<()> {
    if name.is_empty() || name == "." {
        return Err(Error::Invalid("invalid name".into()));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        tracing::warn!(component = name, "rejected unsafe path component");
        return Err(Error::Invalid("invalid name".into()));
    }
    Ok(())
}
