//! # rb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the posting
//! engine. Text responses are transcoded to the wire charset here.

use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::Cookie;
use actix_web::http::header::{self, HeaderMap};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use chrono::Utc;
use rb_core::encoding::{to_wire, WIRE_CHARSET};
use rb_core::transfer::{self, DatTransfer};
use rb_core::views::DatJsonReply;
use rb_core::{AppError, BoardDirectory, BoardService, NewPost, PostReceipt, PostTarget};
use rb_ui::{ConfirmTemplate, CreateThreadErrorTemplate, WriteDoneTemplate, WriteErrorTemplate};
use tracing::{error, warn};

use crate::form::WireForm;
use crate::validator::{self, BadParameter};

const SUBMIT_REPLY: &str = "書き込む";
const SUBMIT_NEW_THREAD: &str = "新規スレッド作成";
const SUBMIT_CONFIRMED: &str = "上記全てを承諾して書き込む";

const SUBJECT_JSON_LIMIT: usize = 10;
const DAT_JSON_LIMIT: usize = 10;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: BoardService,
    pub boards: BoardDirectory,
}

fn wire_text(status: StatusCode, mime: &str, body: &str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(format!("{mime}; charset={WIRE_CHARSET}"))
        .body(to_wire(body).into_owned())
}

fn plain(body: &str) -> HttpResponse {
    wire_text(StatusCode::OK, "text/plain", body)
}

fn page(template: &impl Template) -> HttpResponse {
    match template.render() {
        Ok(html) => wire_text(StatusCode::OK, "text/html", &html),
        Err(err) => {
            error!(%err, "template rendering failed");
            HttpResponse::InternalServerError().body("Internal server error")
        }
    }
}

fn bad_parameter(err: BadParameter) -> HttpResponse {
    HttpResponse::BadRequest().body(err.to_string())
}

fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::NotFound(..) => HttpResponse::NotFound().body("Not found"),
        AppError::MalformedRange(_) => HttpResponse::BadRequest().body("Need Range ?"),
        _ => {
            error!(%err, "request failed");
            HttpResponse::InternalServerError().body("Internal server error")
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn client_addr(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|a| a.ip().to_string())
        .unwrap_or_default()
}

fn has_confirmed(req: &HttpRequest) -> bool {
    let pon = req.cookie("PON").is_some_and(|c| !c.value().is_empty());
    let yuki = req.cookie("yuki").is_some_and(|c| c.value() == "akari");
    pon && yuki
}

/// `POST /test/bbs.cgi`: new threads and replies.
pub async fn bbs_cgi(data: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let form = WireForm::parse(&body);

    let submit = match validator::submit(&form) {
        Ok(s) => s,
        Err(err) => return bad_parameter(err),
    };
    let new_thread = match submit.as_str() {
        SUBMIT_REPLY => false,
        SUBMIT_NEW_THREAD => true,
        SUBMIT_CONFIRMED => !form.contains("key"),
        _ => return plain("SJISで書いてね？"),
    };

    match post(&data, &req, &form, new_thread).await {
        Ok(response) => response,
        Err(err) => bad_parameter(err),
    }
}

async fn post(
    data: &AppState,
    req: &HttpRequest,
    form: &WireForm,
    new_thread: bool,
) -> Result<HttpResponse, BadParameter> {
    let board = validator::board_name(form)?;
    let Some(settings) = data.boards.get(&board) else {
        return Ok(HttpResponse::NotFound().body("Not found"));
    };
    let target = if new_thread {
        PostTarget::NewThread {
            title: validator::title(form, settings)?,
        }
    } else {
        PostTarget::Reply {
            thread_key: validator::thread_key(form)?,
        }
    };
    let time = validator::time(form)?;
    let name = validator::name(form, settings)?;
    let mail = validator::mail(form, settings)?;
    let message = validator::message(form, settings)?;

    let host = req.connection_info().host().to_owned();
    validator::referer(header_str(req.headers(), header::REFERER), &host, &board)?;

    let poster_addr = client_addr(req);
    if !has_confirmed(req) {
        return Ok(confirm(&board, &target, &name, &mail, &message, &time, &poster_addr));
    }

    let started = Utc::now();
    let new_post = NewPost {
        name,
        mail,
        message,
        poster_addr,
    };
    let response = match data
        .service
        .post(settings, &board, &target, &new_post, started)
        .await
    {
        Ok(receipt) => write_done(&host, &receipt, started),
        Err(err) => {
            warn!(%err, board = %board, "post rejected");
            match &target {
                PostTarget::Reply { thread_key } => page(&WriteErrorTemplate {
                    url: &format!("//{host}/test/read.cgi/{board}/{thread_key}/"),
                }),
                PostTarget::NewThread { .. } => page(&CreateThreadErrorTemplate { board: &board }),
            }
        }
    };
    Ok(response)
}

fn confirm(
    board: &str,
    target: &PostTarget,
    name: &str,
    mail: &str,
    message: &str,
    time: &str,
    poster_addr: &str,
) -> HttpResponse {
    let mut response = page(&ConfirmTemplate {
        title: target.title(),
        thread_key: target.thread_key(),
        name,
        mail,
        message,
        board,
        time,
    });
    let expires = OffsetDateTime::now_utc() + CookieDuration::days(7);
    for cookie in [
        Cookie::build("PON", poster_addr.to_owned()),
        Cookie::build("yuki", "akari"),
    ] {
        let cookie = cookie.path("/").expires(expires).finish();
        if let Err(err) = response.add_cookie(&cookie) {
            error!(%err, "could not set confirmation cookie");
        }
    }
    response
}

fn write_done(host: &str, receipt: &PostReceipt, started: chrono::DateTime<Utc>) -> HttpResponse {
    let elapsed = (Utc::now() - started).num_microseconds().unwrap_or_default() as f64 / 1e6;
    let mut response = page(&WriteDoneTemplate {
        url: &format!(
            "//{host}/test/read.cgi/{}/{}/l50",
            receipt.board, receipt.thread_key
        ),
        elapsed: &format!("{elapsed:.6}"),
    });
    let headers = response.headers_mut();
    for (name, value) in [
        ("x-resnum", receipt.res_num.to_string()),
        ("x-postdate", receipt.post_date()),
        ("x-posterid", receipt.poster_id.clone()),
    ] {
        if let Ok(value) = header::HeaderValue::from_str(&value) {
            headers.insert(header::HeaderName::from_static(name), value);
        }
    }
    response
}

/// `GET /{board}/subject.txt`
pub async fn subject_txt(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match data.service.subject_txt(&path).await {
        Ok(txt) => plain(&txt),
        Err(err) => error_response(&err),
    }
}

/// `GET /{board}/SETTING.TXT`
pub async fn setting_txt(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match data.boards.get(&path) {
        Some(settings) => plain(&settings.setting_txt()),
        None => HttpResponse::NotFound().body("Not found"),
    }
}

/// `GET /{board}/subject.json`
pub async fn subject_json(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    if data.boards.get(&path).is_none() {
        return HttpResponse::NotFound().body("Not found");
    }
    match data.service.subject_json(&path, SUBJECT_JSON_LIMIT).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(err) => error_response(&err),
    }
}

/// `GET /{board}/dat/{key}.dat` and `GET /{board}/dat/{key}.json`
pub async fn dat(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (board, file) = path.into_inner();
    let since = header_str(req.headers(), header::IF_MODIFIED_SINCE).filter(|s| !s.is_empty());
    let range = header_str(req.headers(), header::RANGE);

    if let Some(key) = file.strip_suffix(".dat") {
        dat_txt(&data, &board, key, since, range).await
    } else if let Some(key) = file.strip_suffix(".json") {
        dat_json(&data, &board, key, since, range).await
    } else {
        HttpResponse::NotFound().body("Not found")
    }
}

async fn dat_txt(
    data: &AppState,
    board: &str,
    key: &str,
    since: Option<&str>,
    range: Option<&str>,
) -> HttpResponse {
    let transfer = match data.service.dat(board, key).await {
        Ok(dat) => transfer::negotiate(&dat, since, range),
        Err(err) => Err(err),
    };
    let (status, body, last_modified) = match transfer {
        Ok(DatTransfer::Full {
            body,
            last_modified,
        }) => (StatusCode::OK, body, last_modified),
        Ok(DatTransfer::Partial {
            body,
            last_modified,
        }) => (StatusCode::PARTIAL_CONTENT, body, last_modified),
        Ok(DatTransfer::NotModified) => return HttpResponse::NotModified().finish(),
        Ok(DatTransfer::RangeNotSatisfiable) => {
            return HttpResponse::RangeNotSatisfiable().finish()
        }
        Err(err) => return error_response(&err),
    };
    HttpResponse::build(status)
        .content_type(format!("text/plain; charset={WIRE_CHARSET}"))
        .insert_header((header::LAST_MODIFIED, last_modified))
        .body(body)
}

async fn dat_json(
    data: &AppState,
    board: &str,
    key: &str,
    since: Option<&str>,
    range: Option<&str>,
) -> HttpResponse {
    // Here `Range` is a plain message count, not a byte range.
    let after = match since {
        None => 0,
        Some(_) => match range.and_then(|r| r.trim().parse::<usize>().ok()) {
            Some(n) => n,
            None => return HttpResponse::BadRequest().body("Need Range ?"),
        },
    };
    match data
        .service
        .dat_json(board, key, since, after, DAT_JSON_LIMIT)
        .await
    {
        Ok(DatJsonReply::NotModified) => HttpResponse::NotModified().finish(),
        Ok(DatJsonReply::Messages(view)) => {
            let status = if since.is_some() {
                StatusCode::PARTIAL_CONTENT
            } else {
                StatusCode::OK
            };
            HttpResponse::build(status).json(view)
        }
        Err(err) => error_response(&err),
    }
}
