//! Heuristic attribution of stored object keys to repositories.
//!
//! The authoritative record of what a repo owns is the `file_paths` list on
//! its sync record. This predicate is the fallback for recovery paths, when
//! that list is missing or stale. An ambiguous key is presumed NOT to
//! belong.

use crate::platform::Platform;
use crate::repo::{split_repo, version_file_name};

/// Returns true if `key` can be attributed to `repo` (`owner/name`).
pub fn belongs_to(key: &str, repo: &str) -> bool {
    let Some((owner, name)) = split_repo(repo) else {
        return false;
    };

    let file_name = file_name(key);
    if file_name.is_empty() {
        return false;
    }

    if key.contains(&format!("{owner}/{name}/")) || key.contains(&format!("{owner}-{name}")) {
        return true;
    }

    if has_repo_token(file_name, name) {
        return true;
    }

    let in_platform_dir = Platform::ALL.iter().any(|platform| {
        let label = platform.label();
        key.contains(&format!("{label}/{name}"))
            || key.contains(&format!("{name}/{label}"))
            || key.contains(&format!("{label}/{name}-"))
    });
    if in_platform_dir {
        return true;
    }

    if key.contains(&format!("/{name}/"))
        || key.contains(&format!("/{name}-"))
        || key.contains(&format!("-{name}."))
    {
        return true;
    }

    if key.ends_with(&version_file_name(repo)) {
        return true;
    }

    matches_platform_affinity(key, name)
}

/// Whether a file name carries the `_name` token the uploader inserts,
/// before an extension, before another `_` segment, or at the very end.
pub fn has_repo_token(file_name: &str, repo_name: &str) -> bool {
    let token = format!("_{repo_name}");
    file_name.contains(&format!("{token}."))
        || file_name.contains(&format!("{token}_"))
        || file_name.ends_with(&token)
}

/// Final path segment of an object key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Repos whose name suggests a platform claim keys for that platform.
fn matches_platform_affinity(key: &str, name: &str) -> bool {
    let name = name.to_lowercase();
    let lower_key = key.to_lowercase();

    let android_repo = name.contains("android") || name.contains("mobile") || name.contains("app");
    let windows_repo = name.contains("win") || name.contains("desktop") || name.contains("pc");

    let android_key =
        key.ends_with(".apk") || key.contains("/Android/") || lower_key.contains("android");
    let windows_key = key.ends_with(".exe")
        || key.ends_with(".msi")
        || key.contains("/Windows/")
        || lower_key.contains("win");

    (android_repo && android_key) || (windows_repo && windows_key)
}
