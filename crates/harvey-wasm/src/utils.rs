use std::sync::OnceLock;

use regex::Regex;
use wasm_bindgen::JsValue;

/// Chat channel path on the serving host
pub const WS_PATH: &str = "/ws/chat/";

/// `ws:` on plain pages, `wss:` on https pages
pub fn ws_protocol_for(page_protocol: &str) -> &'static str {
    if page_protocol == "https:" {
        "wss:"
    } else {
        "ws:"
    }
}

/// Chat channel URL for the page we are served from
pub fn build_ws_url() -> Result<String, JsValue> {
    let location = web_sys::window()
        .ok_or_else(|| JsValue::from_str("No window"))?
        .location();
    let protocol = location.protocol().unwrap_or_else(|_| "http:".to_string());
    let host = location
        .host()
        .map_err(|_| JsValue::from_str("Failed to get host"))?;
    Ok(format!("{}//{}{}", ws_protocol_for(&protocol), host, WS_PATH))
}

/// Escape HTML to prevent XSS
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn url_pattern() -> Option<&'static Regex> {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?|ftp|file)://[-A-Z0-9+&@#/%?=~_|!:,.;]*[-A-Z0-9+&@#/%=~_|]").ok()
    })
    .as_ref()
}

/// Wrap URLs in already-escaped text in links that open a new tab
pub fn linkify(escaped: &str) -> String {
    let Some(pattern) = url_pattern() else {
        return escaped.to_string();
    };
    pattern
        .replace_all(escaped, |caps: &regex::Captures| {
            let url = &caps[0];
            format!(
                r#"<a href="{}" target="_blank" rel="noopener" class="text-indigo-300 hover:text-white hover:underline underline-offset-2 break-all font-medium">{}</a>"#,
                url, url
            )
        })
        .into_owned()
}

/// Body HTML of a plain-text bubble
pub fn format_plain(text: &str) -> String {
    linkify(&escape_html(text).replace('\n', "<br>"))
}
