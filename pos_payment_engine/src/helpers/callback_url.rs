/// Appends `token=<token>` to the callback URL so that the gateway echoes it back on every webhook.
///
/// * No token ⇒ the URL is returned unchanged.
/// * If the URL already carries a `token` query parameter, it is left alone.
/// * Otherwise the token is URL-encoded and appended with `?` or `&` as appropriate.
pub fn with_token_in_url(url: &str, token: Option<&str>) -> String {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return url.to_string(),
    };
    if has_token_param(url) {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}token={}", urlencoding::encode(token))
}

fn has_token_param(url: &str) -> bool {
    url.match_indices("token=").any(|(i, _)| i > 0 && matches!(url.as_bytes()[i - 1], b'?' | b'&'))
}
