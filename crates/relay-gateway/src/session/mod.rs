//! Session management
//!
//! Issues, validates, and sweeps token-authenticated sessions, and owns each
//! session's ordered client list.

mod store;

pub use store::{
    AdmitError, Client, SessionCredentials, SessionStore, SessionValidation,
};
