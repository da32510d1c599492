use crate::store::Offer;
use anyhow::Context;
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::Command;

const BOM: &str = "\u{feff}";

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

fn offer_row(offer: &Offer) -> String {
    format!(
        r#"<tr>
            <td>
              <strong>{}</strong><br>
              <a href="{}">{}</a><br>
              {} - {}
            </td>
          </tr>
"#,
        escape(&offer.company),
        escape(&offer.url()),
        escape(&offer.title),
        escape(offer.department.as_deref().unwrap_or("")),
        escape(offer.location.as_deref().unwrap_or("")),
    )
}

/// Builds the offer report page. Empty filter lists print as "All" / "None".
pub fn render_html(
    offers: &[Offer],
    keywords: &[String],
    locations: &[String],
    generated_on: NaiveDate,
) -> String {
    let locations = if locations.is_empty() {
        "All".to_string()
    } else {
        locations.join(", ")
    };
    let keywords = if keywords.is_empty() {
        "None".to_string()
    } else {
        keywords.join(", ")
    };
    let rows: String = offers.iter().map(offer_row).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <link rel="stylesheet" href="https://maxcdn.bootstrapcdn.com/bootstrap/4.0.0-alpha.6/css/bootstrap.min.css">
  </head>
  <body>
    <div class="container col-md-4">
      <h2>Job offers
        <small class="text-muted">({})</small>
      </h2>
      <p>Locations: {}</p>
      <p>Keywords: {}</p>
      <table class="table table-striped">
        <thead>
          <tr>
            <th>Offers</th>
          </tr>
        </thead>
        <tbody>
          {}
        </tbody>
      </table>
    </div>
  </body>
</html>
"#,
        generated_on.format("%d/%m/%y"),
        escape(&locations),
        escape(&keywords),
        rows
    )
}

/// Writes the page with a UTF-8 byte-order mark so older viewers pick the
/// right encoding for city names.
pub fn write_html(path: &Path, html: &str) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, format!("{BOM}{html}"))
        .with_context(|| format!("failed to write report {}", path.display()))
}

#[derive(Serialize)]
struct OfferRecord<'a> {
    #[serde(rename = "Company")]
    company: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Department")]
    department: &'a str,
    #[serde(rename = "Location")]
    location: &'a str,
    #[serde(rename = "LastSeen")]
    last_seen: &'a str,
    #[serde(rename = "Url")]
    url: String,
}

pub fn export_csv(path: &Path, offers: &[Offer]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for offer in offers {
        wtr.serialize(OfferRecord {
            company: &offer.company,
            title: &offer.title,
            department: offer.department.as_deref().unwrap_or(""),
            location: offer.location.as_deref().unwrap_or(""),
            last_seen: &offer.last_seen,
            url: offer.url(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Hands a file path or URL to the desktop's default handler. Failures are
/// logged; a missing browser never fails the run.
pub fn open_in_browser(target: &str) {
    let mut command = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };

    match command.arg(target).status() {
        Ok(status) => {
            if !status.success() {
                tracing::warn!("browser launcher exited with {} for {}", status, target);
            }
        }
        Err(e) => {
            tracing::warn!("failed to launch browser for {}: {}", target, e);
        }
    }
}

/// `file://` URL for a local report.
pub fn file_url(path: &Path) -> anyhow::Result<String> {
    let absolute = fs::canonicalize(path)
        .with_context(|| format!("report {} does not exist", path.display()))?;
    Ok(format!("file://{}", absolute.display()))
}
