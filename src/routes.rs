// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    error::AppError,
    handlers::{auth, categories, health, products, reviews, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Milliseconds between quota refills so that `max` requests fit in the window.
fn replenish_interval_ms(window_secs: u64, max: u32) -> u64 {
    (window_secs.saturating_mul(1000) / u64::from(max.max(1))).max(1)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found!".to_string())
}

/// Assembles the main application router.
///
/// * Everything lives under `/api/v1`.
/// * Bearer-protected methods get `auth_middleware`; admin methods additionally get
///   `admin_middleware` (auth runs first).
/// * Applies global middleware (Trace, CORS, rate limiting).
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Double middleware protection: Auth first, then Admin check
    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let admin = ServiceBuilder::new()
        .layer(authenticated.clone())
        .layer(middleware::from_fn(admin_middleware));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users).route_layer(admin.clone()))
        .route(
            "/me",
            get(users::get_me)
                .patch(users::update_me)
                .route_layer(authenticated.clone()),
        )
        .route(
            "/me/addresses",
            post(users::add_address).route_layer(authenticated.clone()),
        )
        .route(
            "/me/addresses/{address_id}",
            patch(users::update_address)
                .delete(users::delete_address)
                .route_layer(authenticated.clone()),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(categories::list_categories)
                .merge(post(categories::create_category).route_layer(admin.clone())),
        )
        .route(
            "/{slug}",
            get(categories::get_category).merge(
                patch(categories::update_category)
                    .delete(categories::delete_category)
                    .route_layer(admin.clone()),
            ),
        );

    let product_routes = Router::new()
        .route(
            "/",
            get(products::list_products)
                .merge(post(products::create_product).route_layer(admin.clone())),
        )
        .route(
            "/{product_id}",
            get(products::get_product).merge(
                patch(products::update_product)
                    .delete(products::delete_product)
                    .route_layer(admin.clone()),
            ),
        )
        .route(
            "/{product_id}/variants",
            post(products::add_variant).route_layer(admin.clone()),
        )
        .route(
            "/{product_id}/variants/{color}/sizes",
            post(products::add_variant_size).route_layer(admin.clone()),
        )
        .route(
            "/{product_id}/variants/{color}/sizes/{size}",
            patch(products::update_size_stock).route_layer(admin.clone()),
        )
        .route(
            "/{product_id}/reviews",
            get(reviews::list_reviews)
                .merge(post(reviews::create_review).route_layer(authenticated.clone())),
        )
        .route(
            "/{product_id}/reviews/{review_id}",
            patch(reviews::update_review)
                .delete(reviews::delete_review)
                .route_layer(authenticated),
        );

    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/categories", category_routes)
        .nest("/products", product_routes);

    let router = Router::new()
        .nest("/api/v1", api)
        .fallback(route_not_found)
        .with_state(state)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        );

    if config.rate_limit_max == 0 {
        return router;
    }

    match GovernorConfigBuilder::default()
        .per_millisecond(replenish_interval_ms(
            config.rate_limit_window_secs,
            config.rate_limit_max,
        ))
        .burst_size(config.rate_limit_max)
        .finish()
    {
        Some(governor_conf) => router.layer(GovernorLayer::new(Arc::new(governor_conf))),
        None => {
            tracing::warn!("Invalid rate limit configuration; rate limiting disabled");
            router
        }
    }
}

#[cfg(test)]
mod tests {
    use super::replenish_interval_ms;

    #[test]
    fn quota_spreads_over_the_window() {
        assert_eq!(replenish_interval_ms(900, 100), 9_000);
        assert_eq!(replenish_interval_ms(1, 5_000), 1);
    }

    #[test]
    fn huge_windows_saturate() {
        assert_eq!(replenish_interval_ms(u64::MAX, 1), u64::MAX);
        assert_eq!(replenish_interval_ms(u64::MAX, 1_000), u64::MAX / 1_000);
    }
}
