//! Bearer token extraction.

/// Scheme prefixes stripped from an `Authorization` value. The match is
/// soft: a value carrying neither prefix is used verbatim.
const SCHEMES: [&str; 2] = ["Bearer ", "Token "];

/// Pull the raw token out of an `Authorization` header value.
///
/// Returns `None` when nothing is left after trimming the scheme.
pub fn token_from_authorization(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .unwrap_or(value)
        .trim();

    if token.is_empty() { None } else { Some(token) }
}
