//! OAuth authorization-code handshake with Backlog.

use backlog_auth::oauth::token::TokenStore;
use backlog_auth::oauth::Provider as _;
use log::*;

use crate::error::{AuthErrorKind, DomainErrorKind, Error};
use crate::gateway::backlog::Backlog;

/// Build the Backlog authorization URL the user agent should be redirected to.
///
/// A fresh CSRF state is registered for every call; the session is not touched.
pub fn authorize_url(backlog: &Backlog) -> String {
    let state = backlog.states().generate();
    backlog.provider().authorization_url(&state).url
}

/// Complete the handshake started by [`authorize_url`].
///
/// Exchanges `code` for a token pair and writes both tokens into `store`. The code is
/// required. A `state` is optional, but when one is supplied it must be one this
/// process issued and has not seen before. On any failure the store is left as it was.
pub async fn complete<S>(
    backlog: &Backlog,
    store: &S,
    code: Option<&str>,
    state: Option<&str>,
) -> Result<(), Error>
where
    S: TokenStore + ?Sized,
{
    let code = code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::auth(AuthErrorKind::MissingCode))?;

    if let Some(state) = state {
        if !backlog.states().validate(state) {
            warn!("OAuth callback carried an unknown or expired state");
            return Err(Error::auth(AuthErrorKind::InvalidState));
        }
    }

    let tokens = backlog.provider().exchange_code(code).await.map_err(|err| {
        Error::wrap(DomainErrorKind::Auth(AuthErrorKind::OAuthExchangeFailed), err)
    })?;

    store.store(&tokens).await?;
    info!("Backlog tokens stored in session");
    Ok(())
}
