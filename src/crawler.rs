use anyhow::Context;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Query that asks a career page for every job in every location.
const LISTING_QUERY: &str = "jobs?department_id=&location_id=";

/// Separator between department and location in the `meta` span.
const META_SEPARATOR: &str = " – ";

/// One job entry as it appears on a company's listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListing {
    pub title: String,
    pub job_id: String,
    pub department: Option<String>,
    pub location: Option<String>,
}

/// Source of listing pages. The crawl loop only needs page bodies, so tests
/// can hand it canned HTML.
pub trait Fetch {
    fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Blocking HTTP fetcher for live career pages.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        // Several career sites serve broken certificate chains.
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(true)
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} -> {}", url, status);
        } else {
            // Error pages carry no listing, so parsing turns them into a skip.
            tracing::warn!("{} -> {}", url, status);
        }
        Ok(response.text()?)
    }
}

/// `https://acme.teamtailor.com/` -> `https://acme.teamtailor.com/jobs?department_id=&location_id=`
pub fn listing_url(base: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), LISTING_QUERY)
}

/// Fetches and parses one company's listing page.
///
/// `Ok(None)` means the page had nothing usable (an HTTP error page included)
/// and the company should be skipped. Transport failures are returned as errors.
pub fn crawl(
    fetcher: &dyn Fetch,
    company: &str,
    base_url: &str,
) -> anyhow::Result<Option<Vec<JobListing>>> {
    let url = listing_url(base_url);
    let html = fetcher
        .fetch(&url)
        .with_context(|| format!("failed to fetch jobs for {company} ({url})"))?;
    Ok(parse_listing(company, &html))
}

struct ListingSelectors {
    container: Selector,
    item: Selector,
    title: Selector,
    meta: Selector,
    anchor: Selector,
    whitespace: Regex,
}

impl ListingSelectors {
    fn new() -> Self {
        let parse = |css: &str| Selector::parse(css).expect("static selector");
        Self {
            container: parse("ul.jobs"),
            item: parse("li"),
            title: parse("span.title"),
            meta: parse("span.meta"),
            anchor: parse("a[href]"),
            whitespace: Regex::new(r"\s+").expect("static regex"),
        }
    }
}

/// Extracts job entries from a listing page.
///
/// Returns `None` when there is no `ul.jobs` container, or when an entry
/// lacks its title span or link: a page that half-parses is dropped whole.
pub fn parse_listing(company: &str, html: &str) -> Option<Vec<JobListing>> {
    let selectors = ListingSelectors::new();
    let document = Html::parse_document(html);

    let Some(container) = document.select(&selectors.container).next() else {
        tracing::info!("no jobs found at {}", company);
        return None;
    };

    let mut listings = Vec::new();
    for item in container.select(&selectors.item) {
        let Some(title) = item.select(&selectors.title).next() else {
            tracing::error!("{}: error parsing jobs, entry without title", company);
            return None;
        };
        let Some(job_id) = item
            .select(&selectors.anchor)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(job_id_from_href)
        else {
            tracing::error!("{}: error parsing jobs, entry without job link", company);
            return None;
        };

        let (department, location) = match item.select(&selectors.meta).next() {
            Some(meta) => split_meta(&title_case(&element_text(meta, &selectors.whitespace))),
            None => (None, None),
        };

        listings.push(JobListing {
            title: title_case(&element_text(title, &selectors.whitespace)),
            job_id,
            department,
            location,
        });
    }
    Some(listings)
}

fn element_text(element: ElementRef, whitespace: &Regex) -> String {
    let text = element.text().collect::<String>();
    whitespace.replace_all(text.trim(), " ").into_owned()
}

/// `/jobs/123456-data-analyst` -> `123456`
fn job_id_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let slug = path.trim_end_matches('/').rsplit('/').next()?;
    let id = slug.split('-').next()?.trim();
    (!id.is_empty()).then(|| id.to_string())
}

fn split_meta(meta: &str) -> (Option<String>, Option<String>) {
    let mut parts = meta
        .split(META_SEPARATOR)
        .map(str::trim)
        .map(|part| (!part.is_empty()).then(|| part.to_string()));
    let department = parts.next().flatten();
    let location = parts.next().flatten();
    (department, location)
}

/// Word-initial letters upper, the rest lower: "DATA analyst" -> "Data Analyst".
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
