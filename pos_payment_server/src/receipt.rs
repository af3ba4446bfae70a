//! # Receipt rendering
//!
//! The gateway hands us receipts as "print strings": plain text interleaved with a small set of printer tags.
//!
//! | tag                  | rendered as                        |
//! |----------------------|------------------------------------|
//! | `<BR>`               | line break                         |
//! | `<SMALL>…</SMALL>`   | small text                         |
//! | `<BOLD>…</BOLD>`     | bold text                          |
//! | `<BIG>…</BIG>`       | large bold text                    |
//! | `<CENTER>…</CENTER>` | centred block                      |
//! | `<LINE>`, `<DLINE>`  | single and double horizontal rules |
//! | `<CUT>`              | dashed "tear here" line            |
//! | `<QR>url</QR>`       | QR code image plus the url         |
//!
//! Text outside the tags is HTML-escaped. Unknown tags are treated as text. The markup is stored verbatim, so
//! rendering always happens at read time.
use once_cell::sync::Lazy;
use pos_payment_engine::db_types::Payment;
use regex::Regex;

pub const QR_IMAGE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
const QR_SIZE: &str = "180x180";

static PRINT_TAGS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?s)<QR>(?P<qr>.*?)</QR>|<(?P<tag>/?(?:BR|SMALL|BOLD|BIG|CENTER|LINE|DLINE|CUT))>").ok()
});

static SPACES: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[ \t]{2,}").ok());

enum Piece<'a> {
    Text(&'a str),
    Tag(&'a str),
    Qr(&'a str),
}

/// Splits the markup into text, tags and QR blocks.
fn tokenize(markup: &str) -> Vec<Piece<'_>> {
    let re = match PRINT_TAGS.as_ref() {
        Some(re) => re,
        None => return vec![Piece::Text(markup)],
    };
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            pieces.push(Piece::Text(&markup[last..whole.start()]));
        }
        if let Some(url) = caps.name("qr") {
            pieces.push(Piece::Qr(url.as_str().trim()));
        } else if let Some(tag) = caps.name("tag") {
            pieces.push(Piece::Tag(tag.as_str()));
        }
        last = whole.end();
    }
    if last < markup.len() {
        pieces.push(Piece::Text(&markup[last..]));
    }
    pieces
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn tag_html(tag: &str) -> &'static str {
    match tag {
        "BR" => "<br/>",
        "SMALL" => r#"<span class="small">"#,
        "BIG" => r#"<span class="big">"#,
        "/SMALL" | "/BIG" => "</span>",
        "BOLD" => "<strong>",
        "/BOLD" => "</strong>",
        "CENTER" => r#"<div class="center">"#,
        "/CENTER" => "</div>",
        "LINE" => r#"<hr class="line"/>"#,
        "DLINE" => r#"<hr class="dline"/>"#,
        "CUT" => r#"<div class="cut"></div>"#,
        _ => "",
    }
}

pub fn qr_image_url(data: &str) -> String {
    format!("{QR_IMAGE_URL}?size={QR_SIZE}&data={}", urlencoding::encode(data))
}

fn qr_html(url: &str) -> String {
    format!(
        r#"<div class="center"><img src="{}" alt="QR"/><div class="qr-url">{}</div></div>"#,
        escape_html(&qr_image_url(url)),
        escape_html(url)
    )
}

/// Converts print-string markup into an HTML fragment.
pub fn markup_to_html(markup: &str) -> String {
    tokenize(markup)
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(t) => escape_html(t),
            Piece::Tag(t) => tag_html(t).to_string(),
            Piece::Qr(url) => qr_html(url),
        })
        .collect()
}

/// Converts print-string markup into plain text, for the text part of receipt emails.
///
/// Line-producing tags become newlines, other tags are dropped, QR blocks are replaced by their url. Runs of spaces
/// are collapsed and blank lines removed.
pub fn markup_to_text(markup: &str) -> String {
    let raw = tokenize(markup)
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(t) => t.to_string(),
            Piece::Tag("BR" | "/CENTER" | "LINE" | "DLINE" | "CUT") => "\n".to_string(),
            Piece::Tag(_) => String::new(),
            Piece::Qr(url) => format!("\n{url}\n"),
        })
        .collect::<String>();
    raw.lines()
        .map(|line| match SPACES.as_ref() {
            Some(re) => re.replace_all(line.trim(), " ").into_owned(),
            None => line.trim().to_string(),
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

const RECEIPT_STYLE: &str = r#"
    :root { color-scheme: light; }
    body { font-family: -apple-system, BlinkMacSystemFont, Segoe UI, Roboto, Inter, Arial, sans-serif; margin: 16px; }
    .wrap { max-width: 360px; margin: 0 auto; }
    .small { font-size: 12px; color: #333; }
    .big { font-size: 18px; font-weight: 700; }
    .center { text-align: center; }
    .line { border: none; border-top: 1px solid #999; margin: 8px 0; }
    .dline { border: none; border-top: 2px solid #000; margin: 10px 0; }
    .cut { border-top: 1px dashed #999; margin: 16px 0; }
    .qr-url { font-size: 11px; word-break: break-all; margin-top: 6px; color: #444; }
    .actions { margin: 12px 0 18px; text-align: center; }
    button { padding: 8px 12px; border-radius: 6px; border: 1px solid #111; background:#111; color:#fff; cursor:pointer; }
    @media print { .actions { display: none; } body { margin: 0; } }
"#;

/// The printable receipt page. It opens the browser's print dialog as soon as it loads.
pub fn render_receipt_page(brand_name: &str, markup: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>{brand} Receipt</title>
  <meta name="viewport" content="width=device-width,initial-scale=1"/>
  <style>{RECEIPT_STYLE}</style>
</head>
<body>
  <div class="wrap">
    <div class="actions"><button onclick="window.print()">Print</button></div>
    {body}
  </div>
  <script> setTimeout(() => {{ try {{ window.print(); }} catch(e) {{}} }}, 300); </script>
</body>
</html>"#,
        brand = escape_html(brand_name),
        body = markup_to_html(markup),
    )
}

/// A minimal summary, used when the gateway never sent us a print string.
fn summary_lines(payment: &Payment) -> Vec<(&'static str, String)> {
    let pair = |value: &Option<String>, currency: &Option<String>| {
        format!("{} {}", value.as_deref().unwrap_or("?"), currency.as_deref().unwrap_or("")).trim().to_string()
    };
    let mut lines = vec![("Payment", payment.payment_id.to_string())];
    if let Some(order_id) = &payment.order_id {
        lines.push(("Order", order_id.clone()));
    }
    lines.push(("Amount", pair(&payment.invoice_amount, &payment.invoice_currency)));
    lines.push(("Paid", pair(&payment.crypto_amount, &payment.currency)));
    if let Some(t) = &payment.confirmed_time {
        lines.push(("Confirmed", t.clone()));
    }
    lines
}

pub fn receipt_subject(brand_name: &str, payment: &Payment) -> String {
    match &payment.order_id {
        Some(order_id) => format!("{brand_name} receipt for order {order_id}"),
        None => format!("{brand_name} receipt {}", payment.payment_id),
    }
}

/// The HTML part of a receipt email.
pub fn render_email_html(brand_name: &str, payment: &Payment, markup: Option<&str>) -> String {
    let body = match markup {
        Some(m) => markup_to_html(m),
        None => summary_lines(payment)
            .into_iter()
            .map(|(k, v)| format!("<div><strong>{k}:</strong> {}</div>", escape_html(&v)))
            .collect(),
    };
    format!(
        r#"<!doctype html><html><head><meta charset="utf-8"/><style>{RECEIPT_STYLE}</style></head><body><div class="wrap"><h2 class="center">{brand}</h2>{body}</div></body></html>"#,
        brand = escape_html(brand_name),
    )
}

/// The plain-text part of a receipt email.
pub fn render_email_text(brand_name: &str, payment: &Payment, markup: Option<&str>) -> String {
    let body = match markup {
        Some(m) => markup_to_text(m),
        None => summary_lines(payment).into_iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>().join("\n"),
    };
    format!("{brand_name}\n\n{body}\n")
}
