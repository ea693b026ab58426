/// Split a free-text block into entity names.
///
/// Newlines and commas both separate names, runs of separators collapse,
/// every token is trimmed and empty tokens are dropped.
pub fn split_bulk_names(input: &str) -> Vec<String> {
    input
        .split(|c| c == '\n' || c == ',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
