use crate::crawler::{self, Fetch};
use crate::filter::CompanySelection;
use crate::store::SqliteStore;
use anyhow::Context;
use chrono::NaiveDate;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub companies_crawled: usize,
    pub companies_skipped: usize,
    pub jobs_recorded: usize,
    pub stale_removed: usize,
}

/// Stale-job policy for one update run.
#[derive(Debug, Clone, Copy)]
pub struct Retention {
    pub clear_old: bool,
    pub max_age_days: u32,
}

/// Crawls every selected company once and stores what it finds.
///
/// Each company's jobs are committed on their own, so an error part way
/// through keeps the companies already done.
pub fn update_jobs(
    store: &mut SqliteStore,
    fetcher: &dyn Fetch,
    selection: &CompanySelection,
    today: NaiveDate,
    retention: Retention,
) -> anyhow::Result<UpdateSummary> {
    tracing::info!("updating jobs");
    let mut summary = UpdateSummary::default();

    let companies = store.companies().context("failed to list companies")?;
    for company in companies.iter().filter(|c| selection.includes(c)) {
        let Some(listings) = crawler::crawl(fetcher, &company.name, &company.url)? else {
            summary.companies_skipped += 1;
            continue;
        };
        let recorded = store
            .record_listings(company.id, &listings, today)
            .with_context(|| format!("failed to store jobs for {}", company.name))?;
        tracing::info!("{}: {} jobs", company.name, recorded);
        summary.companies_crawled += 1;
        summary.jobs_recorded += recorded;
    }

    if retention.clear_old {
        summary.stale_removed = store
            .clear_old_jobs(today, retention.max_age_days)
            .context("failed to clear old jobs")?;
        tracing::info!("removed {} stale jobs", summary.stale_removed);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned pages by URL and records what was asked for.
    struct FakeSite {
        pages: HashMap<String, String>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(base, html)| (crawler::listing_url(base), html.to_string()))
                    .collect(),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetch for FakeSite {
        fn fetch(&self, url: &str) -> anyhow::Result<String> {
            self.requested.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 for {url}"))
        }
    }

    const ACME: &str = "https://acme.teamtailor.com";
    const GLOBEX: &str = "https://globex.teamtailor.com";
    const INITECH: &str = "https://initech.teamtailor.com";

    const ACME_PAGE: &str = r#"
        <ul class="jobs">
          <li><a href="/jobs/1-data-analyst"><span class="title">Data Analyst</span>
              <span class="meta">Data – Göteborg</span></a></li>
          <li><a href="/jobs/2-chef"><span class="title">Chef</span></a></li>
        </ul>"#;

    const CLOSED_PAGE: &str = "<html><body>No open positions</body></html>";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    fn keep_everything() -> Retention {
        Retention { clear_old: false, max_age_days: 7 }
    }

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open store");
        store.insert_company("Acme", ACME).unwrap();
        store.insert_company("Globex", GLOBEX).unwrap();
        store
    }

    #[test]
    fn stores_jobs_and_skips_companies_without_listings() {
        let mut store = seeded_store();
        let site = FakeSite::new(&[(ACME, ACME_PAGE), (GLOBEX, CLOSED_PAGE)]);

        let summary = update_jobs(
            &mut store,
            &site,
            &CompanySelection::default(),
            day(1),
            keep_everything(),
        )
        .unwrap();

        assert_eq!(
            summary,
            UpdateSummary {
                companies_crawled: 1,
                companies_skipped: 1,
                jobs_recorded: 2,
                stale_removed: 0,
            }
        );
        // one request per company
        assert_eq!(site.requested.borrow().len(), 2);
        let offers = store.offers(&["Gothenburg".to_string()]).unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].title, "Data Analyst");
    }

    #[test]
    fn only_selected_companies_are_crawled() {
        let mut store = seeded_store();
        let site = FakeSite::new(&[(ACME, ACME_PAGE)]);
        let selection = CompanySelection::new(&["acme".to_string()]);

        let summary = update_jobs(&mut store, &site, &selection, day(1), keep_everything()).unwrap();

        assert_eq!(summary.companies_crawled, 1);
        assert_eq!(*site.requested.borrow(), vec![crawler::listing_url(ACME)]);
    }

    #[test]
    fn fetch_failure_stops_the_run_but_keeps_earlier_batches() {
        let mut store = seeded_store();
        store.insert_company("Initech", INITECH).unwrap();
        let site = FakeSite::new(&[(ACME, ACME_PAGE), (GLOBEX, CLOSED_PAGE)]);

        let err = update_jobs(
            &mut store,
            &site,
            &CompanySelection::default(),
            day(1),
            keep_everything(),
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("Initech"));
        assert_eq!(store.all_jobs().unwrap().len(), 2);
    }

    #[test]
    fn not_found_page_skips_company_and_crawl_continues() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        store.insert_company("Aaa Closed", INITECH).unwrap();
        store.insert_company("Zzz Live", ACME).unwrap();
        let not_found = "<html><head><title>404</title></head><body>Page not found</body></html>";
        let site = FakeSite::new(&[(INITECH, not_found), (ACME, ACME_PAGE)]);

        let summary = update_jobs(
            &mut store,
            &site,
            &CompanySelection::default(),
            day(1),
            Retention { clear_old: true, max_age_days: 7 },
        )
        .unwrap();

        assert_eq!(summary.companies_skipped, 1);
        assert_eq!(summary.companies_crawled, 1);
        assert_eq!(summary.jobs_recorded, 2);
        let jobs = store.all_jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|job| job.company == "Zzz Live"));
    }

    #[test]
    fn jobs_no_longer_listed_age_out() {
        let mut store = seeded_store();
        let site = FakeSite::new(&[(ACME, ACME_PAGE), (GLOBEX, CLOSED_PAGE)]);
        let selection = CompanySelection::default();
        update_jobs(&mut store, &site, &selection, day(1), keep_everything()).unwrap();

        let shorter = r#"<ul class="jobs">
            <li><a href="/jobs/2-chef"><span class="title">Chef</span></a></li></ul>"#;
        let site = FakeSite::new(&[(ACME, shorter), (GLOBEX, CLOSED_PAGE)]);
        let summary = update_jobs(
            &mut store,
            &site,
            &selection,
            day(10),
            Retention { clear_old: true, max_age_days: 7 },
        )
        .unwrap();

        assert_eq!(summary.stale_removed, 1);
        let offers = store.all_jobs().unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].title, "Chef");
        assert_eq!(offers[0].last_seen, "2024-05-10");
    }
}
