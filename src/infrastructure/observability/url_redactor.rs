use reqwest::Url;

const MAX_VISIBLE_LENGTH: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Renders a callback URL for logs. Callback URLs routinely carry bearer
/// tokens in the query string, so only scheme, host, port and path survive.
pub fn redact_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let redacted = match Url::parse(trimmed) {
        Ok(mut url) => {
            let had_secret_parts = url.query().is_some()
                || url.fragment().is_some()
                || !url.username().is_empty()
                || url.password().is_some();
            url.set_query(None);
            url.set_fragment(None);
            let _ = url.set_username("");
            let _ = url.set_password(None);

            let mut rendered = url.to_string();
            if had_secret_parts {
                rendered.push('?');
                rendered.push_str(REDACTED);
            }
            rendered
        }
        Err(_) => redact_unparsed(trimmed),
    };

    truncate(redacted)
}

fn redact_unparsed(raw: &str) -> String {
    let without_userinfo = match (raw.find("://"), raw.find('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}{}", &raw[..scheme_end + 3], &raw[at + 1..])
        }
        _ => raw.to_string(),
    };

    match without_userinfo.find(['?', '#']) {
        Some(idx) => format!("{}?{}", &without_userinfo[..idx], REDACTED),
        None => without_userinfo,
    }
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_VISIBLE_LENGTH {
        return text;
    }
    let total = text.chars().count();
    let head: String = text.chars().take(MAX_VISIBLE_LENGTH).collect();
    format!("{head}... ({total} chars total)")
}
