//! Auth-domain identifiers, scopes, secrets, app registrations, and credentials.

pub mod app;
pub mod credential;
pub mod id;
pub mod scope;
pub mod token;

pub use app::*;
pub use credential::*;
pub use id::*;
pub use scope::*;
pub use token::*;
