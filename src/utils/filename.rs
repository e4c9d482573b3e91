/// Returns the text after the last dot of `filename`.
///
/// Names without a dot, or ending in one, have no extension.
pub fn extension_of(filename: &str) -> Option<&str> {
    let idx = filename.rfind('.')?;
    let extension = &filename[idx + 1..];
    (!extension.is_empty()).then_some(extension)
}

/// Re-attaches the extension of `filename` to a bare key name.
pub fn with_extension_of(name: &str, filename: &str) -> String {
    match extension_of(filename) {
        Some(extension) => format!("{}.{}", name, extension),
        None => name.to_string(),
    }
}
