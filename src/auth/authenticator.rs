use crate::auth::error::AuthError;
use async_trait::async_trait;
use std::sync::Arc;

/// The signed-in user. `email` is recorded as the annotator of every save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub user_id: String,
}

/// Password sign-in against an identity backend
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError>;
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        (**self).sign_in_with_password(email, password).await
    }
}
