//! # rb-api
//!
//! The 2ch-compatible HTTP surface: `bbs.cgi` for posting and the static-looking
//! board files that browsers poll.

pub mod form;
pub mod handlers;
pub mod middleware;
pub mod validator;

pub use handlers::AppState;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/test/bbs.cgi", web::post().to(handlers::bbs_cgi))
        .route("/{board}/subject.txt", web::get().to(handlers::subject_txt))
        .route("/{board}/subject.json", web::get().to(handlers::subject_json))
        .route("/{board}/SETTING.TXT", web::get().to(handlers::setting_txt))
        // `{key}.dat` or `{key}.json`
        .route("/{board}/dat/{file}", web::get().to(handlers::dat));
}
