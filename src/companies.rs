use crate::store::SqliteStore;
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Company name -> career page URL, as kept in `teamtailor.json`.
pub type CompanyList = BTreeMap<String, String>;

pub fn load_companies(path: &Path) -> anyhow::Result<CompanyList> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read company list {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("company list {} is not a name -> url object", path.display()))
}

pub fn save_companies(path: &Path, companies: &CompanyList) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(companies)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Registers every listed company in the store. Existing names keep their URL.
pub fn add_companies(store: &mut SqliteStore, companies: &CompanyList) -> anyhow::Result<usize> {
    let added = store
        .insert_companies(companies.iter().map(|(name, url)| (name.as_str(), url.as_str())))
        .context("failed to store companies")?;
    tracing::info!("registered {} companies", added);
    Ok(added)
}

/// Adds or corrects one entry in the company list at `path` (created if
/// missing) and registers the list. Unlike [`add_companies`], the named
/// company's stored URL is replaced with `url`.
pub fn add_company(store: &mut SqliteStore, path: &Path, name: &str, url: &str) -> anyhow::Result<i64> {
    let mut list = if path.exists() {
        load_companies(path)?
    } else {
        CompanyList::new()
    };
    if let Some(previous) = list.insert(name.to_string(), url.to_string()) {
        if previous != url {
            tracing::info!("{}: url changed from {} to {}", name, previous, url);
        }
    }
    save_companies(path, &list)?;
    add_companies(store, &list)?;
    store
        .set_company(name, url)
        .with_context(|| format!("failed to store {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(test_name: &str) -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jobfinder_{test_name}_{}_{nonce}.json",
            std::process::id()
        ))
    }

    #[test]
    fn save_then_load_keeps_entries() {
        let path = temp_file("companies_roundtrip");
        let mut list = CompanyList::new();
        list.insert("Storytel".into(), "https://career.storytel.com".into());
        list.insert("Hemnet".into(), "https://jobs.hemnet.se/".into());

        save_companies(&path, &list).unwrap();
        let loaded = load_companies(&path).unwrap();
        assert_eq!(loaded, list);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_non_object_json() {
        let path = temp_file("companies_bad");
        fs::write(&path, r#"["Storytel"]"#).unwrap();
        assert!(load_companies(&path).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn add_company_updates_list_and_stored_url() {
        let path = temp_file("companies_add");
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let mut list = CompanyList::new();
        list.insert("Storytel".into(), "https://old.storytel.com".into());
        save_companies(&path, &list).unwrap();
        add_companies(&mut store, &list).unwrap();

        add_company(&mut store, &path, "Storytel", "https://career.storytel.com").unwrap();
        add_company(&mut store, &path, "Hemnet", "https://jobs.hemnet.se").unwrap();

        let saved = load_companies(&path).unwrap();
        assert_eq!(saved["Storytel"], "https://career.storytel.com");
        assert_eq!(saved.len(), 2);
        let stored = store.companies().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].name, "Storytel");
        assert_eq!(stored[1].url, "https://career.storytel.com");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn add_company_creates_a_missing_list() {
        let path = temp_file("companies_new");
        let mut store = SqliteStore::open_in_memory().expect("open store");
        add_company(&mut store, &path, "Nepa", "https://career.nepa.com").unwrap();
        assert_eq!(load_companies(&path).unwrap().len(), 1);
        assert_eq!(store.companies().unwrap()[0].url, "https://career.nepa.com");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn add_companies_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let mut list = CompanyList::new();
        list.insert("Paradox".into(), "https://career.paradoxplaza.com".into());
        list.insert("Nepa".into(), "https://career.nepa.com".into());

        assert_eq!(add_companies(&mut store, &list).unwrap(), 2);
        assert_eq!(add_companies(&mut store, &list).unwrap(), 2);
        assert_eq!(store.companies().unwrap().len(), 2);
    }
}
