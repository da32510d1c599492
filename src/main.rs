use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use jobfinder::companies::{add_companies, add_company, load_companies};
use jobfinder::config::{Config, DEFAULT_CONFIG_PATH};
use jobfinder::crawler::HttpFetcher;
use jobfinder::filter::{CompanySelection, KeywordFilter};
use jobfinder::locations::CityTranslator;
use jobfinder::pipeline::{update_jobs, Retention};
use jobfinder::store::{Offer, SqliteStore};
use jobfinder::{dashboard, report};

const USAGE: &str = "\
Usage: jobfinder [--config <path>] [command]

Commands:
  run                      crawl, then write the report (default)
  update                   crawl and store jobs only
  report                   write the report from stored jobs
  dashboard                browse the filtered offers in the terminal
  companies                list stored companies
  locations                list stored locations
  departments              list stored departments
  companies add <name> <url>
                           add a company to the company list and store";

enum Command {
    Run,
    Update,
    Report,
    Dashboard,
    Companies,
    Locations,
    Departments,
    AddCompany { name: String, url: String },
}

struct Cli {
    config: PathBuf,
    command: Command,
}

fn parse_cli() -> anyhow::Result<Cli> {
    let mut config = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                config = PathBuf::from(args.next().context("missing value for --config")?)
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => positional.push(arg),
        }
    }

    let command = match positional.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["run"] => Command::Run,
        ["update"] => Command::Update,
        ["report"] => Command::Report,
        ["dashboard"] => Command::Dashboard,
        ["companies"] => Command::Companies,
        ["locations"] => Command::Locations,
        ["departments"] => Command::Departments,
        ["companies", "add", name, url] => Command::AddCompany {
            name: name.to_string(),
            url: url.to_string(),
        },
        other => anyhow::bail!("unknown command: {}\n\n{USAGE}", other.join(" ")),
    };
    Ok(Cli { config, command })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_cli()?;
    let config = Config::load(&cli.config)?;
    let mut store = SqliteStore::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?
        .with_translator(CityTranslator::with_aliases(&config.location_aliases));

    match cli.command {
        Command::Run => {
            update(&mut store, &config)?;
            write_report(&store, &config)?;
        }
        Command::Update => update(&mut store, &config)?,
        Command::Report => write_report(&store, &config)?,
        Command::Dashboard => {
            let offers = filtered_offers(&store, &config)?;
            dashboard::run_dashboard(&offers)?;
        }
        Command::Companies => {
            for company in store.companies()? {
                println!("{}\t{}", company.name, company.url);
            }
        }
        Command::Locations => {
            for location in store.locations()? {
                println!("{}", location.name);
            }
        }
        Command::Departments => {
            for department in store.departments()? {
                println!("{}", department.name);
            }
        }
        Command::AddCompany { name, url } => {
            add_company(&mut store, &config.companies_file, &name, &url)?;
            tracing::info!("added {} to {}", name, config.companies_file.display());
        }
    }
    Ok(())
}

fn update(store: &mut SqliteStore, config: &Config) -> anyhow::Result<()> {
    if config.companies_file.exists() {
        let list = load_companies(&config.companies_file)?;
        add_companies(store, &list)?;
    } else {
        tracing::warn!(
            "company list {} not found, crawling stored companies only",
            config.companies_file.display()
        );
    }

    let fetcher = HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let summary = update_jobs(
        store,
        &fetcher,
        &CompanySelection::new(&config.companies),
        Local::now().date_naive(),
        Retention {
            clear_old: config.clear_old,
            max_age_days: config.stale_after_days,
        },
    )?;
    tracing::info!(
        "crawled {} companies ({} skipped), {} jobs seen, {} stale removed",
        summary.companies_crawled,
        summary.companies_skipped,
        summary.jobs_recorded,
        summary.stale_removed
    );
    Ok(())
}

fn filtered_offers(store: &SqliteStore, config: &Config) -> anyhow::Result<Vec<Offer>> {
    let offers = store
        .offers(&config.locations)
        .context("failed to read offers")?;
    Ok(KeywordFilter::new(&config.keywords, config.case_sensitive).apply(offers))
}

fn write_report(store: &SqliteStore, config: &Config) -> anyhow::Result<()> {
    let offers = filtered_offers(store, config)?;
    let html = report::render_html(
        &offers,
        &config.keywords,
        &config.locations,
        Local::now().date_naive(),
    );
    report::write_html(&config.report_path, &html)?;
    tracing::info!("wrote {} offers to {}", offers.len(), config.report_path.display());

    if let Some(csv_path) = &config.csv_path {
        report::export_csv(csv_path, &offers)?;
        tracing::info!("exported offers to {}", csv_path.display());
    }

    if config.open_browser {
        report::open_in_browser(&report::file_url(&config.report_path)?);
    }
    Ok(())
}
