use super::{log_source_result, str_field, string_list, JsonFetch, VolumeCatalog};
use crate::config::{clamp_max_results, Config};
use crate::models::{BookCandidate, CandidateDraft};
use serde_json::Value;

pub const SOURCE_NAME: &str = "Google Books";

pub struct GoogleBooks<F> {
    fetcher: F,
    base_url: String,
}

impl<F: JsonFetch> GoogleBooks<F> {
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self::with_base_url(fetcher, &config.google_books_url)
    }

    pub fn with_base_url(fetcher: F, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn search_url(&self, query: &str, max_results: usize) -> String {
        format!(
            "{}?q={}&maxResults={}",
            self.base_url,
            urlencoding::encode(query),
            clamp_max_results(max_results)
        )
    }
}

impl<F: JsonFetch> VolumeCatalog for GoogleBooks<F> {
    fn search(&self, query: &str, max_results: usize) -> Vec<BookCandidate> {
        let url = self.search_url(query, max_results);
        let candidates = match self.fetcher.get_json(&url) {
            Some(data) => parse_volumes(&data),
            None => vec![],
        };
        log_source_result(SOURCE_NAME, query, candidates.len());
        candidates
    }
}

/// Map a volumes response to candidates in the catalog's own relevance order.
pub(crate) fn parse_volumes(data: &Value) -> Vec<BookCandidate> {
    let items = match data.get("items").and_then(|value| value.as_array()) {
        Some(items) => items,
        None => return vec![],
    };
    items
        .iter()
        .map(|item| {
            let info = item.get("volumeInfo").unwrap_or(&Value::Null);
            let cover_url = info
                .get("imageLinks")
                .and_then(|links| str_field(links, "thumbnail"))
                .map(|value| value.replace("http://", "https://"));
            let isbn13 = info
                .get("industryIdentifiers")
                .and_then(|value| value.as_array())
                .and_then(|values| {
                    values.iter().find(|entry| {
                        entry.get("type").and_then(|kind| kind.as_str()) == Some("ISBN_13")
                    })
                })
                .and_then(|entry| str_field(entry, "identifier"));
            let published_year =
                str_field(info, "publishedDate").map(|date| date.chars().take(4).collect());

            CandidateDraft {
                title: str_field(info, "title"),
                authors: string_list(info, "authors"),
                cover_url,
                isbn13,
                published_year,
            }
            .finish(SOURCE_NAME)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::CannedFetch;
    use crate::models::{UNKNOWN_AUTHOR, UNKNOWN_ISBN, UNKNOWN_TITLE};
    use serde_json::json;

    const BASE: &str = "https://books.test/volumes";

    #[test]
    fn maps_volume_info_fields() {
        let data = json!({
            "items": [{
                "volumeInfo": {
                    "title": "Crime and Punishment",
                    "authors": ["Fyodor Dostoyevsky", "Oliver Ready"],
                    "imageLinks": { "thumbnail": "http://books.google.com/cover?id=1" },
                    "industryIdentifiers": [
                        { "type": "ISBN_10", "identifier": "0143038095" },
                        { "type": "ISBN_13", "identifier": "9780143038092" },
                        { "type": "ISBN_13", "identifier": "9999999999999" }
                    ],
                    "publishedDate": "2003-01-06"
                }
            }]
        });

        let candidates = parse_volumes(&data);

        assert_eq!(candidates.len(), 1);
        let book = &candidates[0];
        assert_eq!(book.title(), "Crime and Punishment");
        assert_eq!(book.author(), "Fyodor Dostoyevsky, Oliver Ready");
        assert_eq!(book.cover_url(), "https://books.google.com/cover?id=1");
        assert_eq!(book.isbn13(), "9780143038092");
        assert_eq!(book.published_year(), "2003");
        assert_eq!(book.source_name(), SOURCE_NAME);
    }

    #[test]
    fn missing_fields_become_sentinels() {
        let data = json!({
            "items": [{
                "volumeInfo": {
                    "industryIdentifiers": [{ "type": "OTHER", "identifier": "OCLC:1" }]
                }
            }]
        });

        let candidates = parse_volumes(&data);

        assert_eq!(candidates[0].title(), UNKNOWN_TITLE);
        assert_eq!(candidates[0].author(), UNKNOWN_AUTHOR);
        assert_eq!(candidates[0].isbn13(), UNKNOWN_ISBN);
        assert!(!candidates[0].has_cover());
        assert_eq!(candidates[0].published_year(), "");
    }

    #[test]
    fn blank_first_isbn_13_is_not_replaced_by_a_later_one() {
        let data = json!({
            "items": [{
                "volumeInfo": {
                    "title": "Emma",
                    "industryIdentifiers": [
                        { "type": "ISBN_13", "identifier": "  " },
                        { "type": "ISBN_13", "identifier": "9780141439587" }
                    ]
                }
            }]
        });

        let candidates = parse_volumes(&data);

        assert_eq!(candidates[0].isbn13(), UNKNOWN_ISBN);
    }

    #[test]
    fn response_without_items_is_empty() {
        assert!(parse_volumes(&json!({ "totalItems": 0 })).is_empty());
        assert!(parse_volumes(&json!({ "items": "nope" })).is_empty());
        assert!(parse_volumes(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn search_sends_raw_query_and_cap() {
        let google = GoogleBooks::with_base_url(CannedFetch::default(), BASE);

        assert_eq!(
            google.search_url("978-0-14-303809-2", 20),
            "https://books.test/volumes?q=978-0-14-303809-2&maxResults=20"
        );
        assert_eq!(
            google.search_url("the hobbit", 100),
            "https://books.test/volumes?q=the%20hobbit&maxResults=40"
        );
    }

    #[test]
    fn failed_request_yields_no_candidates() {
        let fetcher = CannedFetch::default();
        let google = GoogleBooks::with_base_url(&fetcher, BASE);

        assert!(google.search("dune", 10).is_empty());
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[test]
    fn preserves_catalog_order() {
        let url = "https://books.test/volumes?q=dune&maxResults=10";
        let fetcher = CannedFetch::default().with(
            url,
            json!({
                "items": [
                    { "volumeInfo": { "title": "Dune", "authors": ["Frank Herbert"] } },
                    { "volumeInfo": { "title": "Dune Messiah", "authors": ["Frank Herbert"] } }
                ]
            }),
        );
        let google = GoogleBooks::with_base_url(&fetcher, BASE);

        let titles = google
            .search("dune", 10)
            .iter()
            .map(|book| book.title().to_string())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Dune", "Dune Messiah"]);
    }
}
