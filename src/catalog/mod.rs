//! Catalog adapters and the HTTP seam they share.
//!
//! Each adapter turns one external catalog's response schema into
//! [`BookCandidate`] values. Adapters never fail outward: transport errors,
//! non-success statuses and bodies that are not JSON all surface as "no
//! results" from [`JsonFetch::get_json`], and schema mismatches are skipped
//! while walking the response.

pub mod google_books;
pub mod open_library;

use crate::config::Config;
use crate::models::BookCandidate;
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

pub use google_books::GoogleBooks;
pub use open_library::OpenLibrary;

static SEARCH_DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Free-text volume search (Google Books).
pub trait VolumeCatalog {
    fn search(&self, query: &str, max_results: usize) -> Vec<BookCandidate>;
}

/// Exact ISBN lookup plus free-text search (Open Library).
pub trait BibkeyCatalog {
    fn lookup_by_isbn(&self, isbn: &str) -> Option<BookCandidate>;
    fn search_text(&self, query: &str, max_results: usize) -> Vec<BookCandidate>;
}

/// Fetch a URL and decode its body as JSON. `None` covers every failure.
pub trait JsonFetch {
    fn get_json(&self, url: &str) -> Option<Value>;
}

impl<T: JsonFetch + ?Sized> JsonFetch for &T {
    fn get_json(&self, url: &str) -> Option<Value> {
        (**self).get_json(url)
    }
}

pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

impl JsonFetch for HttpFetcher {
    fn get_json(&self, url: &str) -> Option<Value> {
        let debug_enabled = search_debug_enabled();
        if debug_enabled {
            log::info!("[search-debug] http start url={}", url);
        }

        // Single attempt: a failed catalog is simply absent from this search.
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .send();
        let response = match response {
            Ok(value) => value,
            Err(err) => {
                log::warn!("catalog request failed for {}: {}", url, err);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("catalog request returned {} for {}", status, url);
            return None;
        }
        if debug_enabled {
            log::info!("[search-debug] http success url={} status={}", url, status);
        }

        match response.json::<Value>() {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("catalog response parse failed for {}: {}", url, err);
                None
            }
        }
    }
}

pub(crate) fn search_debug_enabled() -> bool {
    *SEARCH_DEBUG_ENABLED.get_or_init(|| {
        std::env::var("BOOKLEDGER_SEARCH_DEBUG")
            .map(|value| {
                let lowered = value.trim().to_ascii_lowercase();
                lowered == "1" || lowered == "true" || lowered == "yes" || lowered == "on"
            })
            .unwrap_or(false)
    })
}

pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|entry| entry.as_str())
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
}

pub(crate) fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|entry| entry.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn log_source_result(source: &str, query: &str, found: usize) {
    if search_debug_enabled() {
        if found > 0 {
            log::info!(
                "[search-debug] source hit source={} query=\"{}\" candidates={}",
                source,
                query,
                found
            );
        } else {
            log::info!("[search-debug] source miss source={} query=\"{}\"", source, query);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::JsonFetch;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned responses keyed by exact URL; unknown URLs behave like a failed request.
    #[derive(Default)]
    pub(crate) struct CannedFetch {
        responses: HashMap<String, Value>,
        pub(crate) requested: RefCell<Vec<String>>,
    }

    impl CannedFetch {
        pub(crate) fn with(mut self, url: &str, body: Value) -> Self {
            self.responses.insert(url.to_string(), body);
            self
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requested.borrow().clone()
        }
    }

    impl JsonFetch for CannedFetch {
        fn get_json(&self, url: &str) -> Option<Value> {
            self.requested.borrow_mut().push(url.to_string());
            self.responses.get(url).cloned()
        }
    }
}
