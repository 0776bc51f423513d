use axum::{
    routing::{any, get, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::access::TableRegistry;
use crate::auth::{CredentialVerifier, IdentityLookup, IdentityRepository, SessionCache, TokenCodec, TokenError};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::database::DataStore;
use crate::filter::{Filter, Translator};
use crate::handlers::{self, protected, public};
use crate::middleware::{cors, HeaderCredentials, SessionToken};
use crate::services::Gateway;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub credentials: Arc<CredentialVerifier>,
    pub identities: Arc<dyn IdentityLookup>,
    pub tokens: Arc<TokenCodec>,
    pub sessions: Arc<SessionCache>,
    pub proxy: Arc<Gateway>,
    pub secure_proxy: Arc<Gateway>,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, clock: Arc<dyn Clock>, config: &AppConfig) -> Result<Self, TokenError> {
        let credentials = Arc::new(CredentialVerifier::new(store.clone()));
        let identities: Arc<dyn IdentityLookup> = Arc::new(IdentityRepository::new(store.clone()));
        let tokens = Arc::new(TokenCodec::new(&config.security.jwt_secret, clock.clone())?);
        let sessions = Arc::new(SessionCache::new(
            identities.clone(),
            clock,
            config.session_cache_window(),
        ));
        let translator = Translator::new(Filter::new(config.filter.max_limit));

        let proxy = Gateway::new(
            Arc::new(HeaderCredentials::new(credentials.clone())),
            TableRegistry::standard(),
            translator.clone(),
            store.clone(),
        );
        let secure_proxy = Gateway::new(
            Arc::new(SessionToken::new(tokens.clone(), sessions.clone())),
            TableRegistry::extended(),
            translator,
            store.clone(),
        );

        Ok(Self {
            store,
            credentials,
            identities,
            tokens,
            sessions,
            proxy: Arc::new(proxy),
            secure_proxy: Arc::new(secure_proxy),
            session_ttl: config.session_ttl(),
        })
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(public::health))
        .merge(auth_routes())
        .merge(branch_routes())
        .merge(secure_proxy_routes())
        .layer(cors::allow_list(&config.security.cors_origins))
        // Any-origin CORS for the header-credential proxy only
        .merge(proxy_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        // Original single endpoint, dispatched on body.action
        .route("/api/auth", post_only(post(auth::action)))
        .route("/api/auth/login", post_only(post(auth::login)))
        .route("/api/auth/validate", post_only(post(auth::validate)))
        .route("/api/auth/logout", post_only(post(auth::logout)))
}

fn branch_routes() -> Router<AppState> {
    Router::new().route(
        "/api/filiais",
        get(public::filiais::list)
            .options(cors::preflight)
            .fallback(handlers::method_not_allowed),
    )
}

fn secure_proxy_routes() -> Router<AppState> {
    use protected::secure_proxy;

    Router::new()
        .route("/api/secure-proxy", proxy_methods(secure_proxy::handle))
        .route("/api/secure-proxy/authenticate", post_only(post(secure_proxy::authenticate)))
}

fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/proxy", proxy_methods(protected::proxy::handle))
        .layer(cors::any_origin())
}

fn post_only(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.options(cors::preflight).fallback(handlers::method_not_allowed)
}

/// Every method reaches the gateway, which answers 405 itself; OPTIONS short-circuits.
fn proxy_methods<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    any(handler).options(cors::preflight)
}
