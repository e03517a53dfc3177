use crate::{
    controller::{health_check_controller, issue_controller, oauth_controller},
    middleware::rate_limit::{self, RateLimits},
    AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Backlog Relay API"
        ),
        paths(
            health_check_controller::root,
            health_check_controller::health_check,
            oauth_controller::login,
            oauth_controller::callback,
            oauth_controller::logout,
            issue_controller::index,
        ),
        tags(
            (name = "backlog_relay", description = "Backlog OAuth relay and issue search API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let rate_limits = app_state
        .config
        .rate_limit_enabled
        .then(RateLimits::new);

    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone(), rate_limits.as_ref()))
        .merge(issue_routes(app_state, rate_limits.as_ref()))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new()
        .route("/", get(health_check_controller::root))
        .route("/health", get(health_check_controller::health_check))
}

fn oauth_routes(app_state: AppState, rate_limits: Option<&RateLimits>) -> Router {
    let router = Router::new()
        .route("/auth/login", get(oauth_controller::login))
        .route("/auth/callback", get(oauth_controller::callback))
        .route("/auth/logout", post(oauth_controller::logout));

    let router = match rate_limits {
        Some(limits) => router.route_layer(from_fn_with_state(
            limits.auth.clone(),
            rate_limit::enforce,
        )),
        None => router,
    };

    router.with_state(app_state)
}

fn issue_routes(app_state: AppState, rate_limits: Option<&RateLimits>) -> Router {
    let router = Router::new().route("/api/issues", get(issue_controller::index));

    // The search limit is checked first, then the limit shared by all of /api.
    let router = match rate_limits {
        Some(limits) => router
            .route_layer(from_fn_with_state(limits.api.clone(), rate_limit::enforce))
            .route_layer(from_fn_with_state(
                limits.search.clone(),
                rate_limit::enforce,
            )),
        None => router,
    };

    router.with_state(app_state)
}
