//! Subject and body rendering for digest alert emails.
//!
//! Missing services are listed before stopped ones; a section is omitted when
//! it has no entries.

use std::fmt::Write;

use watchdog_core::alert::{AlertEntry, AlertPayload};

/// Timestamp layout used in alert bodies.
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

const MISSING_HEADING: &str = "Missing / Not Found Service";
const STOPPED_HEADING: &str = "Stopped Service";
const CALL_TO_ACTION: &str = "Please check and take the necessary actions.";

/// Email subject line for `payload`.
pub fn subject(payload: &AlertPayload) -> String {
    format!("WatchDog Services Alert - {}", payload.host)
}

/// HTML body for `payload`. All service and host names are escaped.
pub fn html_body(payload: &AlertPayload) -> String {
    let mut body = String::new();
    body.push_str("<html>\n  <body style='font-family:Segoe UI, sans-serif; color:#333;'>\n");
    body.push_str("    <h2 style='color:#d9534f;'>WatchDog Service Alert</h2>\n");
    let _ = write!(
        body,
        "    <p>\n      <strong>Server:</strong> {}<br/>\n      <strong>Timestamp:</strong> {}\n    </p>\n",
        escape_html(&payload.host),
        payload.timestamp.format(TIMESTAMP_FORMAT),
    );

    html_section(&mut body, MISSING_HEADING, &payload.missing);
    html_section(&mut body, STOPPED_HEADING, &payload.stopped);

    let _ = write!(
        body,
        "    <p style='margin-top:20px;'>{CALL_TO_ACTION}</p>\n    <p>Best Regards,<br/>WatchDog Service</p>\n  </body>\n</html>\n"
    );
    body
}

/// Plain-text alternative carrying the same content as [`html_body`].
pub fn text_body(payload: &AlertPayload) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "WatchDog Service Alert");
    let _ = writeln!(body);
    let _ = writeln!(body, "Server: {}", payload.host);
    let _ = writeln!(
        body,
        "Timestamp: {}",
        payload.timestamp.format(TIMESTAMP_FORMAT)
    );

    text_section(&mut body, MISSING_HEADING, &payload.missing);
    text_section(&mut body, STOPPED_HEADING, &payload.stopped);

    let _ = writeln!(body);
    let _ = writeln!(body, "{CALL_TO_ACTION}");
    let _ = writeln!(body);
    let _ = writeln!(body, "Best Regards,");
    let _ = writeln!(body, "WatchDog Service");
    body
}

fn heading(base: &str, count: usize) -> String {
    if count == 1 {
        base.to_string()
    } else {
        format!("{base}s")
    }
}

fn html_section(body: &mut String, base: &str, entries: &[AlertEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(
        body,
        "    <h3 style='color:#f0ad4e;'>{}</h3>\n    <ul>",
        heading(base, entries.len())
    );
    for entry in entries {
        let _ = writeln!(
            body,
            "      <li>{} (<code>{}</code>)</li>",
            escape_html(&entry.display_name),
            escape_html(&entry.service_name),
        );
    }
    body.push_str("    </ul>\n");
}

fn text_section(body: &mut String, base: &str, entries: &[AlertEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(body);
    let _ = writeln!(body, "{}:", heading(base, entries.len()));
    for entry in entries {
        let _ = writeln!(body, "  - {} ({})", entry.display_name, entry.service_name);
    }
}

/// Escape the five HTML-significant characters.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
