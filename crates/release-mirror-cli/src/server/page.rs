//! The status page served at `/`.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use release_mirror::{COMPLETION_SENTINEL, RepoStatus, StatusSnapshot};
use release_mirror_github::RateLimit;

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;width:100%}\
th,td{text-align:left;padding:.4rem .6rem;border-bottom:1px solid #ddd}\
.synced{color:#1a7f37}.error{color:#cf222e}.syncing,.pending{color:#9a6700}\
#log{background:#f6f8fa;padding:1rem;min-height:4rem;white-space:pre-wrap}";

// EventSource reconnects on close, so the script closes it on the terminal
// line to avoid starting a second pass.
const SCRIPT: &str = r#"
function startSync(repo) {
  const log = document.getElementById("log");
  log.textContent = "";
  const url = repo ? "/sync?repo=" + encodeURIComponent(repo) : "/sync";
  const source = new EventSource(url);
  source.onmessage = (event) => {
    log.textContent += event.data + "\n";
    if (event.data === SENTINEL || event.data.startsWith("sync failed:")) {
      source.close();
      setTimeout(() => location.reload(), 1000);
    }
  };
  source.onerror = () => {
    source.close();
    log.textContent += "connection closed before the sync finished; reload to see its state\n";
  };
}
"#;

/// Render the status table, sync controls, and rate-limit footer.
pub fn render(snapshot: &StatusSnapshot, rate: Option<RateLimit>) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    html.push_str("<title>Release Mirror</title>");
    let _ = write!(html, "<style>{STYLE}</style></head><body>");
    html.push_str("<h1>Release Mirror</h1>");

    let _ = write!(
        html,
        "<p>Last scheduled check: {}</p>",
        format_time(snapshot.last_check)
    );

    if snapshot.is_syncing {
        html.push_str("<p><strong>A sync is running.</strong></p>");
    }

    html.push_str(
        "<table><thead><tr><th>Repository</th><th>Path</th><th>Version</th>\
         <th>Status</th><th>Files</th><th>Updated</th><th></th></tr></thead><tbody>",
    );
    for repo in &snapshot.repos {
        render_row(&mut html, repo);
    }
    html.push_str("</tbody></table>");

    let _ = write!(
        html,
        "<p><button onclick=\"startSync()\"{}>Sync all</button></p>",
        disabled(snapshot.is_syncing)
    );
    html.push_str("<pre id=\"log\"></pre>");

    if let Some(rate) = rate {
        let _ = write!(
            html,
            "<p>GitHub API: {} of {} requests left, resets {}</p>",
            rate.remaining,
            rate.limit,
            format_time(rate.reset_at())
        );
    }

    let _ = write!(
        html,
        "<script>const SENTINEL = \"{COMPLETION_SENTINEL}\";{SCRIPT}</script></body></html>"
    );
    html
}

fn render_row(html: &mut String, repo: &RepoStatus) {
    let status = repo.status.to_string();
    let mut note = String::new();
    if let Some(message) = &repo.message {
        note.push_str(&escape(message));
    }
    if let Some(error) = &repo.error {
        if !note.is_empty() {
            note.push_str("<br>");
        }
        note.push_str(&escape(error));
    }

    let _ = write!(
        html,
        "<tr><td>{repo_name}</td><td>{path}</td><td>{version}</td>\
         <td class=\"{status}\">{status}<br><small>{note}</small></td>\
         <td>{files}</td><td>{updated}</td>\
         <td><button onclick=\"startSync('{repo_name}')\">Sync</button></td></tr>",
        repo_name = escape(&repo.repo),
        path = escape(display_path(&repo.path)),
        version = escape(repo.version.as_deref().unwrap_or("-")),
        files = repo.file_count,
        updated = format_time(repo.last_update),
    );
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

fn disabled(yes: bool) -> &'static str {
    if yes { " disabled" } else { "" }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_owned())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
