pub mod auth;
pub mod error;
pub mod routes;

use axum::Router;
use local_deployment::LocalDeployment;
use tower_http::trace::TraceLayer;

pub type DeploymentImpl = LocalDeployment;

/// Assemble the full API router.
pub fn app_router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(routes::onboarding::router(&deployment))
        .merge(routes::entry_form::router(&deployment))
        .merge(routes::drivers::router(&deployment))
        .merge(routes::vehicles::router(&deployment))
        .merge(routes::catalogs::router(&deployment))
        .merge(routes::planning::router(&deployment))
        .merge(routes::activity::router(&deployment))
        .merge(routes::preferences::router(&deployment))
        .merge(routes::usage::router(&deployment))
        .merge(routes::exports::router(&deployment))
        .merge(routes::checkout::router(&deployment))
        .merge(routes::reports::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
