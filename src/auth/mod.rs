pub mod authenticator;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod supabase;

pub use authenticator::{Authenticator, Identity};
pub use error::AuthError;
#[cfg(test)]
pub use fake::FakeAuthenticator;
pub use supabase::SupabaseAuth;
