//! Result pages of `bbs.cgi`. Rendered as UTF-8; the caller transcodes them
//! to the wire charset.

use askama::Template;

#[derive(Template)]
#[template(path = "write_done.html")]
pub struct WriteDoneTemplate<'a> {
    /// Where the refresh sends the poster, normally the thread's last 50.
    pub url: &'a str,
    pub elapsed: &'a str,
}

#[derive(Template)]
#[template(path = "write_error.html")]
pub struct WriteErrorTemplate<'a> {
    pub url: &'a str,
}

#[derive(Template)]
#[template(path = "create_thread_error.html")]
pub struct CreateThreadErrorTemplate<'a> {
    pub board: &'a str,
}

/// Shown until the confirmation cookies are set. Echoes the post back as
/// hidden fields so the poster can resubmit it unchanged.
#[derive(Template)]
#[template(path = "confirm.html")]
pub struct ConfirmTemplate<'a> {
    pub title: Option<&'a str>,
    pub thread_key: Option<&'a str>,
    pub name: &'a str,
    pub mail: &'a str,
    pub message: &'a str,
    pub board: &'a str,
    pub time: &'a str,
}
