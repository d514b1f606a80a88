//! Middleware de CORS
//!
//! Este módulo maneja la configuración de CORS para permitir
//! requests desde diferentes orígenes.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

/// Crear middleware de CORS configurado para desarrollo
/// NOTA: Permite cualquier origen - solo para desarrollo
pub fn cors_middleware() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Crear middleware de CORS con orígenes específicos.
/// Sin orígenes configurados se usa la política permisiva de desarrollo.
pub fn cors_middleware_with_origins(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("⚠️ Origen CORS inválido ignorado: {}", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return cors_middleware();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
