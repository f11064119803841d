//! Middleware shared by every route.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Access log in the usual combined format. Records go through the `log`
/// facade, which the binary bridges into `tracing`.
pub fn standard_middleware() -> Logger {
    Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#)
}

/// Browser readers on other origins may fetch the read endpoints and see the
/// post receipt headers.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .expose_headers(vec!["x-Resnum", "x-PostDate", "x-PosterID", "Last-Modified"])
        .max_age(3600)
}
