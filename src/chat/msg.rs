use serde::Serialize;
use time::macros::format_description;

use crate::models::{Message, MessageId, Timestamp, UserId};

use super::names::NameCache;

pub const MY_LABEL: &str = "Me";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub body: String,
    pub html: String,
    /// Drawn muted.
    pub deleted: bool,
    pub sender: String,
    /// Own messages are the only ones offering delete on long-press.
    pub mine: bool,
    pub time: Option<String>,
}

impl MessageView {
    pub fn new(message: &Message, me: Option<&UserId>, names: &NameCache) -> Self {
        let mine = me == Some(&message.sender);
        let body = message.display_body().to_owned();

        Self {
            id: message.id.clone(),
            html: render_markdown(&body),
            body,
            deleted: message.is_deleted,
            sender: if mine {
                MY_LABEL.to_owned()
            } else {
                names.label(&message.sender).to_owned()
            },
            mine,
            time: message.created_at.and_then(format_time),
        }
    }
}

pub fn format_time(at: Timestamp) -> Option<String> {
    at.to_datetime()?
        .format(format_description!("[hour]:[minute]:[second]"))
        .ok()
}

/// Markdown to HTML. Raw HTML in the source is shown as text, and links or
/// images pointing anywhere but http(s), mailto or a relative path are reduced
/// to their text.
pub fn render_markdown(body: &str) -> String {
    use pulldown_cmark::{html, Event, Parser, Tag, TagEnd};

    // one entry per open link or image: whether its tags are kept
    let mut open = Vec::new();
    let parser = Parser::new(body).filter_map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::Link { ref dest_url, .. }) | Event::Start(Tag::Image { ref dest_url, .. }) => {
            let keep = is_safe_url(dest_url);
            open.push(keep);
            keep.then_some(event)
        }
        Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
            open.pop().unwrap_or(false).then_some(event)
        }
        _ => Some(event),
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn is_safe_url(url: &str) -> bool {
    // browsers ignore whitespace and control characters inside a scheme
    let url = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match url.find([':', '/', '?', '#']) {
        Some(at) if url[at..].starts_with(':') => {
            matches!(&url[..at], "http" | "https" | "mailto")
        }
        _ => true,
    }
}
