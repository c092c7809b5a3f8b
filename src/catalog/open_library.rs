use super::{log_source_result, str_field, string_list, BibkeyCatalog, JsonFetch};
use crate::config::{clamp_max_results, Config};
use crate::models::{BookCandidate, CandidateDraft};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const SOURCE_NAME: &str = "Open Library";

static YEAR_RE: OnceLock<Option<Regex>> = OnceLock::new();

pub struct OpenLibrary<F> {
    fetcher: F,
    books_url: String,
    search_url: String,
    covers_url: String,
}

impl<F: JsonFetch> OpenLibrary<F> {
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher,
            books_url: config.open_library_books_url.trim_end_matches('/').to_string(),
            search_url: config.open_library_search_url.trim_end_matches('/').to_string(),
            covers_url: config.open_library_covers_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn bibkey_url(&self, isbn: &str) -> String {
        format!(
            "{}?bibkeys=ISBN:{}&format=json&jscmd=data",
            self.books_url,
            urlencoding::encode(isbn)
        )
    }

    pub(crate) fn text_search_url(&self, query: &str, max_results: usize) -> String {
        format!(
            "{}?q={}&limit={}",
            self.search_url,
            urlencoding::encode(query),
            clamp_max_results(max_results)
        )
    }
}

impl<F: JsonFetch> BibkeyCatalog for OpenLibrary<F> {
    fn lookup_by_isbn(&self, isbn: &str) -> Option<BookCandidate> {
        let isbn = isbn.trim();
        if isbn.is_empty() {
            return None;
        }
        let data = self.fetcher.get_json(&self.bibkey_url(isbn))?;
        let candidate = parse_bibkey_entry(&data, isbn);
        log_source_result(SOURCE_NAME, isbn, usize::from(candidate.is_some()));
        candidate
    }

    fn search_text(&self, query: &str, max_results: usize) -> Vec<BookCandidate> {
        let url = self.text_search_url(query, max_results);
        let candidates = match self.fetcher.get_json(&url) {
            Some(data) => parse_search_docs(&data, &self.covers_url),
            None => vec![],
        };
        log_source_result(SOURCE_NAME, query, candidates.len());
        candidates
    }
}

/// Read the entry stored under the exact `ISBN:<isbn>` bibkey, if any.
pub(crate) fn parse_bibkey_entry(data: &Value, isbn: &str) -> Option<BookCandidate> {
    let entry = data.get(format!("ISBN:{}", isbn))?;
    if !entry.is_object() {
        return None;
    }

    let authors = entry
        .get("authors")
        .and_then(|value| value.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|author| str_field(author, "name"))
                .collect()
        })
        .unwrap_or_default();
    let cover_url = entry
        .get("cover")
        .and_then(|cover| str_field(cover, "medium"));
    let published_year = str_field(entry, "publish_date")
        .map(|date| extract_year(&date).unwrap_or(date));
    // Prefer the edition's own ISBN-13 over whatever form the caller looked up.
    let isbn13 = entry
        .get("identifiers")
        .and_then(|ids| string_list(ids, "isbn_13").into_iter().next())
        .or_else(|| Some(isbn.to_string()));

    Some(
        CandidateDraft {
            title: str_field(entry, "title"),
            authors,
            cover_url,
            isbn13,
            published_year,
        }
        .finish(SOURCE_NAME),
    )
}

/// Map search docs to candidates, skipping docs without a title.
pub(crate) fn parse_search_docs(data: &Value, covers_url: &str) -> Vec<BookCandidate> {
    let docs = match data.get("docs").and_then(|value| value.as_array()) {
        Some(docs) => docs,
        None => return vec![],
    };
    docs.iter()
        .filter_map(|doc| {
            let title = str_field(doc, "title")?;
            let cover_url = doc
                .get("cover_i")
                .and_then(|value| value.as_i64())
                .map(|id| format!("{}/{}-M.jpg", covers_url, id));
            let isbn13 = string_list(doc, "isbn").into_iter().next();
            let published_year = doc
                .get("first_publish_year")
                .and_then(|value| value.as_i64())
                .map(|year| year.to_string());

            Some(
                CandidateDraft {
                    title: Some(title),
                    authors: string_list(doc, "author_name"),
                    cover_url,
                    isbn13,
                    published_year,
                }
                .finish(SOURCE_NAME),
            )
        })
        .collect()
}

/// First standalone four-digit group in a free-form date such as "March 2003".
fn extract_year(text: &str) -> Option<String> {
    let regex = YEAR_RE
        .get_or_init(|| Regex::new(r"\b(\d{4})\b").ok())
        .as_ref()?;
    let captures = regex.captures(text)?;
    Some(captures.get(1)?.as_str().to_string())
}
