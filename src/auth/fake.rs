use crate::auth::authenticator::{Authenticator, Identity};
use crate::auth::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// `FakeAuthenticator` signs users in against an in-memory table
#[derive(Clone, Default)]
pub struct FakeAuthenticator {
    users: Arc<Mutex<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl FakeAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an authenticator that knows a single user
    pub fn with_user(email: &str, password: &str) -> Self {
        let auth = Self::new();
        auth.fake_add_user(email, password);
        auth
    }

    pub fn fake_add_user(&self, email: &str, password: &str) {
        let mut users = self.users.lock().unwrap();
        users.insert(email.to_string(), password.to_string());
    }

    /// Simulate the identity backend being unreachable
    pub fn fake_set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("Simulated auth outage".to_string()));
        }

        let users = self.users.lock().unwrap();
        match users.get(email) {
            Some(expected) if expected == password => Ok(Identity {
                email: email.to_string(),
                user_id: format!("fake-{}", email),
            }),
            _ => Err(AuthError::InvalidCredentials(
                "Invalid login credentials".to_string(),
            )),
        }
    }
}
