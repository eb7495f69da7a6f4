pub const PATH_SEPARATOR: char = '\\';

/// Normalize a share-relative path into a file state key.
///
/// The directory portion is uppercased so that lookups are case-insensitive,
/// the final component keeps its case so the name can still be displayed as
/// the client created it. Forward slashes are accepted and converted.
pub fn normalize_path(path: &str) -> String {
    let mut path = path.replace('/', "\\");

    while path.len() > 1 && path.ends_with(PATH_SEPARATOR) {
        path.pop();
    }

    match path.rfind(PATH_SEPARATOR) {
        None | Some(0) => path,
        Some(idx) => {
            let (dir, name) = path.split_at(idx);
            let mut normalized = dir.to_uppercase();
            normalized.push_str(name);
            normalized
        }
    }
}

/// Split a normalized path into its directory and file name parts.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind(PATH_SEPARATOR) {
        Some(0) => ("\\", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}
