//! Document tree provider backed by host directories.
//!
//! A directory becomes reachable only after it has been granted; the grant
//! yields a `local:<token>` capability that can be persisted and later
//! resolved back to the directory. Entries below the granted directory are
//! reached by name lookup exactly like any other document provider.

mod grants;
mod provider;

pub use grants::{default_grants_file, GrantStore};
pub use provider::{LocalProvider, SCHEME};
