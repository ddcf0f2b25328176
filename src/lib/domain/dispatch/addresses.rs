//! Recipient list parsing

/// Separator used by the storage layer between addresses in a recipient column
pub const ADDRESS_DELIMITER: char = ';';

/// Splits a delimited recipient column into individual addresses.
///
/// Empty fields (leading, trailing or repeated delimiters) are dropped. The
/// addresses themselves are passed through untouched; the mail transport is
/// the one that rejects malformed ones. An absent column yields no addresses.
pub fn parse_addresses(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(ADDRESS_DELIMITER)
            .filter(|field| !field.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
