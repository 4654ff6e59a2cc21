//! Last-resort offline page for navigations with nothing cached.

use bytes::Bytes;

use shellcache_core::ResponseSnapshot;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>{{title}}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <style>
      body { font-family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: #0f172a; color: #f8fafc; display: grid; min-height: 100vh; place-content: center; text-align: center; }
      h1 { font-size: 1.5rem; margin-bottom: 1rem; }
      p { font-size: 1rem; line-height: 1.5; color: #e2e8f0; }
    </style>
  </head>
  <body>
    <h1>You are offline</h1>
    <p>Connect to the internet to sync your data. Saved content will be available again as soon as the connection returns.</p>
  </body>
</html>
"#;

/// Build the offline placeholder: a self-contained HTML page with status 503.
///
/// Never written to a store.
pub fn offline_response(app_name: &str, url: &str) -> ResponseSnapshot {
    let html = TEMPLATE.replace("{{title}}", &escape_html(app_name));
    ResponseSnapshot {
        url: url.to_string(),
        status: 503,
        status_text: "Service Unavailable".into(),
        headers: vec![
            ("content-type".into(), "text/html; charset=utf-8".into()),
            ("cache-control".into(), "no-store".into()),
        ],
        body: Bytes::from(html),
        stored_at: None,
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
