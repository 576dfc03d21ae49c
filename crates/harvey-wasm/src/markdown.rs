use pulldown_cmark::{html, Event, Options, Parser};

use crate::utils;

/// Render an assistant reply to HTML.
///
/// Raw HTML in the reply is shown as text, never injected.
pub fn render_reply(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    linkify_outside_anchors(&html_output)
}

// Bare URLs in text become links; existing markdown links are left alone
fn linkify_outside_anchors(html: &str) -> String {
    if html.contains("<a href") {
        return html.to_string();
    }
    utils::linkify(html)
}
