use crate::crawler::JobListing;
use crate::locations::CityTranslator;
use chrono::{Days, NaiveDate};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanyRow {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// A Location or Department row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedRow {
    pub id: i64,
    pub name: String,
}

/// A stored job joined with its company, location and department.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Offer {
    pub title: String,
    pub job_id: String,
    pub location: Option<String>,
    pub department: Option<String>,
    pub company: String,
    pub company_url: String,
    pub last_seen: String,
}

impl Offer {
    /// Link to the posting on the company's career page.
    pub fn url(&self) -> String {
        format!("{}/jobs/{}", self.company_url.trim_end_matches('/'), self.job_id)
    }
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    translator: CityTranslator,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            translator: CityTranslator::default(),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Replaces the city table used by [`Self::insert_location`].
    pub fn with_translator(mut self, translator: CityTranslator) -> Self {
        self.translator = translator;
        self
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS Company (
              id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
              name TEXT NOT NULL UNIQUE,
              url TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS Location (
              id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
              name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS Department (
              id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
              name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS Job (
              id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
              title TEXT NOT NULL,
              job_id TEXT NOT NULL,
              last_seen TEXT NOT NULL DEFAULT CURRENT_DATE,
              company_id INTEGER NOT NULL REFERENCES Company(id) ON DELETE CASCADE,
              dept_id INTEGER REFERENCES Department(id),
              location_id INTEGER REFERENCES Location(id)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS unq_job ON Job (title, job_id, company_id);
            "#,
        )?;
        Ok(())
    }

    pub fn insert_company(&self, name: &str, url: &str) -> Result<i64, StoreError> {
        upsert_company(&self.conn, name, url)
    }

    /// Like [`Self::insert_company`], but an existing company takes the new URL.
    pub fn set_company(&self, name: &str, url: &str) -> Result<i64, StoreError> {
        let (name, url) = company_fields(name, url)?;
        self.conn.execute(
            "INSERT INTO Company (name, url) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET url = excluded.url",
            params![name, url],
        )?;
        company_id(&self.conn, name)
    }

    pub fn insert_location(&self, name: Option<&str>) -> Result<Option<i64>, StoreError> {
        upsert_location(&self.conn, &self.translator, name)
    }

    pub fn insert_department(&self, name: Option<&str>) -> Result<Option<i64>, StoreError> {
        upsert_named(&self.conn, NamedTable::Department, name)
    }

    pub fn insert_job(
        &self,
        title: &str,
        job_id: &str,
        location_id: Option<i64>,
        dept_id: Option<i64>,
        company_id: i64,
        seen_on: NaiveDate,
    ) -> Result<(), StoreError> {
        upsert_job(&self.conn, title, job_id, location_id, dept_id, company_id, seen_on)
    }

    /// Stores one company's crawl result in a single transaction.
    pub fn record_listings(
        &mut self,
        company_id: i64,
        listings: &[JobListing],
        seen_on: NaiveDate,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        for job in listings {
            let dept_id = upsert_named(&tx, NamedTable::Department, job.department.as_deref())?;
            let location_id = upsert_location(&tx, &self.translator, job.location.as_deref())?;
            upsert_job(&tx, &job.title, &job.job_id, location_id, dept_id, company_id, seen_on)?;
        }
        tx.commit()?;
        Ok(listings.len())
    }

    /// Upserts a batch of companies in one transaction. Returns how many were given.
    pub fn insert_companies<'a>(
        &mut self,
        companies: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        for (name, url) in companies {
            upsert_company(&tx, name, url)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn companies(&self) -> Result<Vec<CompanyRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, url FROM Company ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(CompanyRow {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn locations(&self) -> Result<Vec<NamedRow>, StoreError> {
        self.named_rows(NamedTable::Location)
    }

    pub fn departments(&self) -> Result<Vec<NamedRow>, StoreError> {
        self.named_rows(NamedTable::Department)
    }

    fn named_rows(&self, table: NamedTable) -> Result<Vec<NamedRow>, StoreError> {
        let sql = format!("SELECT id, name FROM {} ORDER BY id", table.name());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(NamedRow {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn all_jobs(&self) -> Result<Vec<Offer>, StoreError> {
        self.offers(&[])
    }

    /// Jobs whose location is one of `locations`, or every job when the list
    /// is empty. Ordered by company name, then insertion order.
    ///
    /// The filter names go through the same casing and translation as stored
    /// locations, so `göteborg` finds jobs stored as `Gothenburg`.
    pub fn offers(&self, locations: &[String]) -> Result<Vec<Offer>, StoreError> {
        let locations: Vec<String> = locations
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| self.translator.normalize(name))
            .collect();
        let filter = if locations.is_empty() {
            String::new()
        } else {
            let placeholders = (1..=locations.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("WHERE Location.name IN ({placeholders})")
        };
        let sql = format!(
            r#"
            SELECT
              Job.title, Job.job_id, Location.name, Department.name,
              Company.name, Company.url, Job.last_seen
            FROM Job
              JOIN Company ON Job.company_id = Company.id
              LEFT JOIN Location ON Job.location_id = Location.id
              LEFT JOIN Department ON Job.dept_id = Department.id
            {filter}
            ORDER BY Company.name, Job.id
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(locations.iter()), |row| {
            Ok(Offer {
                title: row.get(0)?,
                job_id: row.get(1)?,
                location: row.get(2)?,
                department: row.get(3)?,
                company: row.get(4)?,
                company_url: row.get(5)?,
                last_seen: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Deletes jobs not seen within `max_age_days` of `today`.
    pub fn clear_old_jobs(&self, today: NaiveDate, max_age_days: u32) -> Result<usize, StoreError> {
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(max_age_days)))
            .ok_or(StoreError::InvalidInput("stale cut-off is out of range"))?;
        let removed = self.conn.execute(
            "DELETE FROM Job WHERE last_seen < ?1",
            params![cutoff.format(DATE_FORMAT).to_string()],
        )?;
        Ok(removed)
    }
}

#[derive(Clone, Copy)]
enum NamedTable {
    Location,
    Department,
}

impl NamedTable {
    fn name(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Department => "Department",
        }
    }
}

fn company_fields<'a>(name: &'a str, url: &'a str) -> Result<(&'a str, &'a str), StoreError> {
    let name = name.trim();
    let url = url.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput("company name must not be empty"));
    }
    if url.is_empty() {
        return Err(StoreError::InvalidInput("company url must not be empty"));
    }
    Ok((name, url))
}

fn company_id(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    let id = conn.query_row(
        "SELECT id FROM Company WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn upsert_company(conn: &Connection, name: &str, url: &str) -> Result<i64, StoreError> {
    let (name, url) = company_fields(name, url)?;
    conn.execute(
        "INSERT OR IGNORE INTO Company (name, url) VALUES (?1, ?2)",
        params![name, url],
    )?;
    company_id(conn, name)
}

fn upsert_location(
    conn: &Connection,
    translator: &CityTranslator,
    name: Option<&str>,
) -> Result<Option<i64>, StoreError> {
    let translated = name.map(|name| translator.translate(name));
    upsert_named(conn, NamedTable::Location, translated.as_deref())
}

fn upsert_named(
    conn: &Connection,
    table: NamedTable,
    name: Option<&str>,
) -> Result<Option<i64>, StoreError> {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(None);
    };
    let table = table.name();
    conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (name) VALUES (?1)"),
        params![name],
    )?;
    let id = conn
        .query_row(
            &format!("SELECT id FROM {table} WHERE name = ?1"),
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn upsert_job(
    conn: &Connection,
    title: &str,
    job_id: &str,
    location_id: Option<i64>,
    dept_id: Option<i64>,
    company_id: i64,
    seen_on: NaiveDate,
) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO Job (title, job_id, location_id, dept_id, company_id, last_seen)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(title, job_id, company_id) DO UPDATE SET
          last_seen = excluded.last_seen,
          location_id = excluded.location_id,
          dept_id = excluded.dept_id
        "#,
        params![
            title,
            job_id,
            location_id,
            dept_id,
            company_id,
            seen_on.format(DATE_FORMAT).to_string()
        ],
    )?;
    Ok(())
}
