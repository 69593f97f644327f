//! Identity provider trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::events::AuthEvent;
use crate::result::AppResult;
use crate::types::{Principal, SignInRequestId};

/// The remote service that issues, refreshes and ends sessions.
///
/// Implementations must publish every session change on the channel
/// returned by [`IdentityProvider::subscribe`].
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Returns the session persisted by the provider, if any.
    ///
    /// Fails with an error of kind `Session` when the fetch itself fails.
    async fn current_session(&self) -> AppResult<Option<Principal>>;

    /// Signs in with email and password.
    ///
    /// The provider must echo `request` as the `origin` of the resulting
    /// [`AuthEvent::SignedIn`] so explicit sign-ins can be told apart from
    /// replayed sessions.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        request: SignInRequestId,
    ) -> AppResult<Principal>;

    /// Ends the current session.
    async fn sign_out(&self) -> AppResult<()>;

    /// Subscribes to session change events.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
