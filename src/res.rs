use std::borrow::Cow;

use axum::{http::StatusCode, response::{Html, IntoResponse, Response}, Json};
use serde::Serialize;
use time::{macros::format_description, OffsetDateTime};

use crate::{error::ActionError, session::{Flash, FlashKind, Identity}};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Substitutes `{name}` placeholders in one pass. Substituted text is never
/// scanned again, and unknown placeholders are left alone.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let value = after.find('}').and_then(|end| {
            let key = &after[..end];
            values.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Link targets a post may carry: http, https, mailto, or no scheme at all.
fn allowed_url(url: &str) -> bool {
    // browsers drop whitespace and control characters inside a scheme
    let cleaned: String = url.chars().filter(|c| !c.is_ascii_whitespace() && !c.is_control()).collect();
    match cleaned.find([':', '/', '?', '#']) {
        Some(i) if cleaned[i..].starts_with(':') => {
            matches!(cleaned[..i].to_ascii_lowercase().as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

/// Renders user-written Markdown. Raw HTML in the source comes out as text
/// and links or images with any other scheme point nowhere.
pub fn markdown(source: &str) -> String {
    use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};

    fn safe(url: CowStr<'_>) -> CowStr<'_> {
        if allowed_url(&url) { url } else { CowStr::Borrowed("#") }
    }

    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
                Event::Start(Tag::Link { link_type, dest_url: safe(dest_url), title, id })
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
                Event::Start(Tag::Image { link_type, dest_url: safe(dest_url), title, id })
            }
            _ => event,
        });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

/// `2025-03-01 18:30`, or nothing for a date that cannot be shown.
pub fn when(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

fn flash_html(flash: Option<&Flash>) -> String {
    match flash {
        Some(flash) => {
            let class = match flash.kind {
                FlashKind::Success => "flash success",
                FlashKind::Error => "flash error",
            };
            format!(r#"<div class="{class}">{}</div>"#, escape(&flash.message))
        }
        None => String::new(),
    }
}

/// Wraps a page body in the shared layout.
pub fn page(title: &str, identity: Option<&Identity>, flash: Option<&Flash>, body: &str) -> Html<String> {
    let nav = match identity {
        Some(me) => fill(
            include_res!(str, "/pages/nav_user.html"),
            &[("email", escape(&me.email).as_ref())],
        ),
        None => include_res!(str, "/pages/nav_guest.html").to_owned(),
    };

    Html(fill(
        include_res!(str, "/pages/layout.html"),
        &[
            ("title", escape(title).as_ref()),
            ("nav", nav.as_str()),
            ("flash", flash_html(flash).as_str()),
            ("body", body),
        ],
    ))
}

/// `<li>` list of field errors for a re-rendered form.
pub fn errors_html(err: Option<&ActionError>) -> String {
    match err {
        Some(ActionError::Invalid(errors)) => {
            let items: String = errors
                .iter()
                .map(|e| format!("<li>{}</li>", escape(&e.message)))
                .collect();
            format!(r#"<ul class="errors">{items}</ul>"#)
        }
        Some(other) => format!(r#"<ul class="errors"><li>{}</li></ul>"#, escape(&other.to_string())),
        None => String::new(),
    }
}

pub fn sorry(thing: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(fill(include_res!(str, "/pages/sorry.html"), &[("thing", escape(thing).as_ref())])),
    )
        .into_response()
}

/// `{success, message}` body of the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub success: bool,
    pub message: String,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Json<Reply> {
        Json(Reply { success: true, message: message.into() })
    }

    pub fn failed(message: impl Into<String>) -> Json<Reply> {
        Json(Reply { success: false, message: message.into() })
    }

    /// Failure reply carrying the error's own status code.
    pub fn from_error(err: &ActionError) -> Response {
        (err.status(), Reply::failed(err.to_string())).into_response()
    }
}
