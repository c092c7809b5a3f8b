/// Strip surrounding whitespace and every hyphen from a raw query.
pub fn normalize_isbn_query(raw: &str) -> String {
    raw.trim().replace('-', "").trim().to_string()
}

/// Nothing left to search for once whitespace and hyphens are removed.
pub fn is_blank_query(raw: &str) -> bool {
    normalize_isbn_query(raw).is_empty()
}

/// True when the query, once hyphens and surrounding whitespace are removed, is
/// a non-empty run of ASCII digits.
///
/// Length and checksum are not checked: any all-digit string counts, so this
/// only routes the search and must not be used to validate an ISBN.
pub fn is_isbn_shaped(raw: &str) -> bool {
    let normalized = normalize_isbn_query(raw);
    !normalized.is_empty() && normalized.chars().all(|ch| ch.is_ascii_digit())
}
