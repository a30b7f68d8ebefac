use std::borrow::Cow;

use url::Url;

pub fn to_full_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.into()
    }
}

/// Resolves `url` against `base` unless it is already absolute.
pub fn to_absolute_url(base: &str, url: &str) -> Option<String> {
    let url = to_full_url(url);
    if let Ok(absolute) = Url::parse(&url) {
        return Some(absolute.to_string());
    }

    Url::parse(base)
        .and_then(|base| base.join(&url))
        .map(|resolved| resolved.to_string())
        .ok()
}

/// True when the url path names an HLS playlist. Query and fragment are ignored.
pub fn is_streaming_container(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => Cow::Owned(parsed.path().to_owned()),
        Err(_) => Cow::Borrowed(url.split(['?', '#']).next().unwrap_or(url)),
    };

    path.to_ascii_lowercase().ends_with(".m3u8")
}

/// Undoes the escaping of a quoted JS string literal body: `\\`, `\'` and `\"`.
/// Other escape sequences are kept verbatim.
pub fn unescape_js_string(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next @ ('\\' | '\'' | '"')) = chars.peek() {
                result.push(next);
                chars.next();
                continue;
            }
        }
        result.push(ch);
    }

    Cow::Owned(result)
}
