//! Remote dataset catalog
//!
//! [`Catalog`] is the narrow interface the fetcher needs: a facet search and a
//! resolution of search results to local files. [`EsgfCatalog`] implements it
//! against an ESGF `esg-search` index node, keeping downloads in a local cache.

use crate::config::Facets;
use crate::errors::{FetchError, Result};
use crate::registry::file_hash;
use directories::BaseDirs;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_INDEX_NODE: &str = "https://esgf-node.ornl.gov/esg-search/search";

const PAGE_SIZE: usize = 500;

/// One logical dataset returned by a catalog search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Version-independent identifier, shared by all replicas
    pub key: String,
    /// Catalog ids of every replica of this dataset
    pub dataset_ids: Vec<String>,
    pub fields: BTreeMap<String, String>,
}

impl CatalogEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Search and file resolution for a dataset archive
pub trait Catalog {
    /// Latest datasets matching every facet (any of the values for list facets).
    fn search(&self, facets: &Facets) -> Result<Vec<CatalogEntry>>;

    /// Local paths of all files of a dataset, fetching them if needed.
    fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<PathBuf>>;
}

/// `r<N>i<N>p<N>f<N>` as numbers, ignoring any `<sub-experiment>-` prefix.
pub fn parse_variant_label(member_id: &str) -> Option<[u32; 4]> {
    let label = member_id.rsplit('-').next()?;
    let mut parsed = [0u32; 4];
    let mut rest = label;
    for (slot, prefix) in parsed.iter_mut().zip(['r', 'i', 'p', 'f']) {
        rest = rest.strip_prefix(prefix)?;
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        *slot = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
    }
    rest.is_empty().then_some(parsed)
}

fn member_order(member_id: &str) -> (u8, [u32; 4], String) {
    match parse_variant_label(member_id) {
        Some(label) => (0, label, member_id.to_string()),
        None => (1, [u32::MAX; 4], member_id.to_string()),
    }
}

/// Keep one ensemble member per logical dataset.
///
/// Entries are grouped by their key with the member token removed; the member
/// with the lowest variant label wins. Entries without `member_id` are kept.
/// First-appearance order of the groups is preserved.
pub fn remove_ensembles(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut chosen: BTreeMap<String, CatalogEntry> = BTreeMap::new();

    for entry in entries {
        let group = match entry.field("member_id") {
            Some(member) => entry
                .key
                .split('.')
                .filter(|token| *token != member)
                .collect::<Vec<_>>()
                .join("."),
            None => entry.key.clone(),
        };

        match chosen.get(&group) {
            None => {
                order.push(group.clone());
                chosen.insert(group, entry);
            }
            Some(current) => {
                let current_member = current.field("member_id").unwrap_or_default();
                let candidate_member = entry.field("member_id").unwrap_or_default();
                if member_order(candidate_member) < member_order(current_member) {
                    chosen.insert(group, entry);
                }
            }
        }
    }

    let kept: Vec<CatalogEntry> = order
        .iter()
        .filter_map(|group| chosen.remove(group))
        .collect();
    debug!("Ensemble removal kept {} datasets", kept.len());
    kept
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "numFound")]
    num_found: usize,
    docs: Vec<Map<String, Value>>,
}

/// Flatten a search document to text fields.
///
/// Single-element lists are unwrapped and longer lists joined with `,`;
/// nested objects are dropped.
pub fn flatten_document(doc: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for (name, value) in doc {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Null | Value::Object(_) => continue,
        };
        fields.insert(name.clone(), text);
    }
    fields
}

fn strip_version(instance_id: &str) -> &str {
    match instance_id.rsplit_once('.') {
        Some((head, last))
            if last.len() > 1
                && last.starts_with('v')
                && last[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => instance_id,
    }
}

/// Build catalog entries from dataset search documents, merging replicas.
pub fn parse_dataset_documents(docs: &[Map<String, Value>]) -> Result<Vec<CatalogEntry>> {
    let mut entries: Vec<CatalogEntry> = Vec::new();

    for doc in docs {
        let fields = flatten_document(doc);
        let id = fields
            .get("id")
            .cloned()
            .ok_or_else(|| FetchError::CatalogResponse("dataset record without 'id'".into()))?;

        let key = match (fields.get("master_id"), fields.get("instance_id")) {
            (Some(master_id), _) => master_id.clone(),
            (None, Some(instance_id)) => strip_version(instance_id).to_string(),
            (None, None) => id.split('|').next().unwrap_or(id.as_str()).to_string(),
        };

        match entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => existing.dataset_ids.push(id),
            None => entries.push(CatalogEntry {
                key,
                dataset_ids: vec![id],
                fields,
            }),
        }
    }

    Ok(entries)
}

/// A file listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub filename: String,
    pub url: Option<String>,
    /// Expected SHA-256, lower-case hex
    pub sha256: Option<String>,
}

/// Build remote file descriptions from file search documents.
///
/// Only `HTTPServer` endpoints are used; other access methods stream.
pub fn parse_file_documents(docs: &[Map<String, Value>]) -> Result<Vec<RemoteFile>> {
    docs.iter()
        .map(|doc| {
            let filename = doc
                .get("title")
                .and_then(first_string)
                .ok_or_else(|| FetchError::CatalogResponse("file record without 'title'".into()))?;

            let url = doc.get("url").and_then(Value::as_array).and_then(|urls| {
                urls.iter().filter_map(Value::as_str).find_map(|entry| {
                    let mut parts = entry.split('|');
                    let url = parts.next()?;
                    (parts.nth(1) == Some("HTTPServer")).then(|| url.to_string())
                })
            });

            let checksum_type = doc.get("checksum_type").and_then(first_string);
            let sha256 = match checksum_type.as_deref() {
                Some(kind) if kind.eq_ignore_ascii_case("sha256") => doc
                    .get("checksum")
                    .and_then(first_string)
                    .map(|c| c.to_ascii_lowercase()),
                _ => None,
            };

            Ok(RemoteFile {
                filename,
                url,
                sha256,
            })
        })
        .collect()
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// ESGF index node client with a local download cache
pub struct EsgfCatalog {
    client: Client,
    index_url: String,
    cache_dir: PathBuf,
}

impl EsgfCatalog {
    pub fn new(index_url: &str, cache_dir: PathBuf) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cmip-testdata/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FetchError::Generic(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            index_url: index_url.to_string(),
            cache_dir,
        })
    }

    /// `~/.esgf`, the conventional ESGF download cache.
    pub fn default_cache_dir() -> Result<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".esgf"))
            .ok_or_else(|| FetchError::Generic("unable to resolve home directory".to_string()))
    }

    /// Run a search, following pagination until every document is collected.
    fn query(&self, params: &[(String, String)]) -> Result<Vec<Map<String, Value>>> {
        let mut docs = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut page_params = params.to_vec();
            page_params.push(("format".into(), "application/solr+json".into()));
            page_params.push(("limit".into(), PAGE_SIZE.to_string()));
            page_params.push(("offset".into(), offset.to_string()));

            let response = self
                .client
                .get(&self.index_url)
                .query(&page_params)
                .send()?;
            if !response.status().is_success() {
                return Err(FetchError::HttpStatus {
                    status: response.status().as_u16(),
                    url: response.url().to_string(),
                });
            }

            let page: SearchResponse = response.json()?;
            let received = page.response.docs.len();
            docs.extend(page.response.docs);
            offset += received;

            if received == 0 || offset >= page.response.num_found {
                break;
            }
        }

        Ok(docs)
    }

    fn local_path(&self, entry: &CatalogEntry, filename: &str) -> PathBuf {
        let instance = entry.field("instance_id").unwrap_or(entry.key.as_str());
        let mut path = self.cache_dir.clone();
        for part in instance.split('.') {
            path.push(part);
        }
        path.join(filename)
    }

    fn fetch_file(&self, remote: &RemoteFile, target: &Path) -> Result<()> {
        if target.exists() {
            match &remote.sha256 {
                None => return Ok(()),
                Some(expected) if file_hash(target)? == *expected => return Ok(()),
                Some(_) => warn!(
                    "Cached file {} does not match catalog checksum, downloading again",
                    target.display()
                ),
            }
        }

        let url = remote.url.as_deref().ok_or_else(|| {
            FetchError::CatalogResponse(format!(
                "no HTTPServer endpoint for {}",
                remote.filename
            ))
        })?;
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        info!("Downloading {}", url);
        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let mut staged = NamedTempFile::new_in(parent)?;
        io::copy(&mut response, &mut staged)?;

        if let Some(expected) = &remote.sha256 {
            let actual = file_hash(staged.path())?;
            if actual != *expected {
                return Err(FetchError::ChecksumMismatch {
                    path: target.to_path_buf(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        staged
            .persist(target)
            .map_err(|err| FetchError::IoError(err.error))?;
        Ok(())
    }

    fn resolve_replica(&self, entry: &CatalogEntry, dataset_id: &str) -> Result<Vec<PathBuf>> {
        let params = vec![
            ("type".to_string(), "File".to_string()),
            ("dataset_id".to_string(), dataset_id.to_string()),
        ];
        let mut files = parse_file_documents(&self.query(&params)?)?;
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        files.dedup_by(|a, b| a.filename == b.filename);

        let mut paths = Vec::with_capacity(files.len());
        for remote in &files {
            let target = self.local_path(entry, &remote.filename);
            self.fetch_file(remote, &target)?;
            paths.push(target);
        }
        Ok(paths)
    }
}

impl Catalog for EsgfCatalog {
    fn search(&self, facets: &Facets) -> Result<Vec<CatalogEntry>> {
        let mut params = vec![
            ("type".to_string(), "Dataset".to_string()),
            ("latest".to_string(), "true".to_string()),
            ("distrib".to_string(), "true".to_string()),
        ];
        for (name, value) in facets {
            for v in value.values() {
                params.push((name.clone(), v.to_string()));
            }
        }

        let docs = self.query(&params)?;
        let entries = parse_dataset_documents(&docs)?;
        info!(
            "Search matched {} datasets ({} records)",
            entries.len(),
            docs.len()
        );
        Ok(entries)
    }

    fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<PathBuf>> {
        let mut last_error = None;
        for dataset_id in &entry.dataset_ids {
            match self.resolve_replica(entry, dataset_id) {
                Ok(paths) => return Ok(paths),
                Err(err) => {
                    warn!("Replica {} unavailable: {}", dataset_id, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            FetchError::CatalogResponse(format!("dataset {} has no replicas", entry.key))
        }))
    }
}
