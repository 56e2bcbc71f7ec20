//! Server-rendered HTML view of the service registry

use chrono::{DateTime, Utc};
use conductor_core::{ServiceEntry, ServiceStatus};
use std::fmt::Write;

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn status_class(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Healthy => "healthy",
        ServiceStatus::Unhealthy => "unhealthy",
        ServiceStatus::Unknown => "unknown",
    }
}

const STYLE: &str = r#"
    body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0; background: #f4f6fb; color: #1f2933; }
    header { background: #243b53; color: #fff; padding: 24px 32px; }
    header h1 { margin: 0 0 4px; font-size: 24px; }
    header p { margin: 0; opacity: 0.8; }
    main { padding: 24px 32px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 16px; }
    .card { background: #fff; border-radius: 8px; padding: 16px; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }
    .card h2 { font-size: 16px; margin: 0 0 8px; }
    .address { font-family: monospace; color: #486581; }
    .status { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 12px; }
    .status.healthy { background: #e3f9e5; color: #207227; }
    .status.unhealthy { background: #ffe3e3; color: #a61b1b; }
    .status.unknown { background: #e4e7eb; color: #52606d; }
    .empty { color: #829ab1; }
"#;

/// Render the registry dashboard
pub fn render_dashboard(entries: &[ServiceEntry], generated_at: DateTime<Utc>) -> String {
    let mut html = String::new();

    // Writing to a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Conductor Coordinator</title>\n<style>{}</style>\n</head>\n<body>\n\
         <header><h1>Conductor Coordinator</h1><p>{} registered services, generated {}</p></header>\n\
         <main>\n",
        STYLE,
        entries.len(),
        generated_at.to_rfc3339()
    );

    if entries.is_empty() {
        html.push_str("<p class=\"empty\">No services registered.</p>\n");
    } else {
        html.push_str("<div class=\"grid\">\n");
        for entry in entries {
            let description = entry
                .description()
                .map(|d| format!("<p>{}</p>", escape_html(&d)))
                .unwrap_or_default();
            let _ = write!(
                html,
                "<div class=\"card\"><h2>{}</h2><span class=\"status {}\">{}</span>\
                 <p class=\"address\">{}</p>{}</div>\n",
                escape_html(entry.name.as_str()),
                status_class(entry.status),
                entry.status,
                escape_html(&entry.address),
                description
            );
        }
        html.push_str("</div>\n");
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}
