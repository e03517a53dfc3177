//! Issue search on behalf of the session's user.

use backlog_auth::oauth::token::TokenStore;
use bytes::Bytes;
use url::Url;

use crate::error::{AuthErrorKind, DomainErrorKind, Error, ExternalErrorKind};
use crate::gateway::backlog::Backlog;

/// Append every caller-supplied query pair to `base`, keeping order and duplicates.
pub fn search_url(base: &Url, params: &[(String, String)]) -> Url {
    let mut url = base.clone();
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    url
}

/// Search issues with the caller's query parameters forwarded verbatim.
///
/// Returns Backlog's JSON body untouched. Failures other than a missing or expired
/// credential are reported as `UpstreamFetchFailed` with the original error as source.
pub async fn search<S>(
    backlog: &Backlog,
    store: &S,
    params: &[(String, String)],
) -> Result<Bytes, Error>
where
    S: TokenStore + ?Sized,
{
    fetch(backlog, store, params).await.map_err(|err| match err.error_kind {
        DomainErrorKind::Auth(_)
        | DomainErrorKind::External(ExternalErrorKind::UpstreamFetchFailed) => err,
        _ => Error::wrap(
            DomainErrorKind::External(ExternalErrorKind::UpstreamFetchFailed),
            err,
        ),
    })
}

async fn fetch<S>(
    backlog: &Backlog,
    store: &S,
    params: &[(String, String)],
) -> Result<Bytes, Error>
where
    S: TokenStore + ?Sized,
{
    if store.access_token().await?.is_none() {
        return Err(Error::auth(AuthErrorKind::NotAuthenticated));
    }

    let url = search_url(backlog.issues_url(), params);
    backlog.call_api(store, &url).await
}
