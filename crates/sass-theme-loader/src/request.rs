//! Import request handling.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Expands the URL of an `@import`/`@use` into the file names a SASS
//! compiler would try for it, and resolves those names against a base
//! directory purely lexically (no file-system access).
//!
//! For `@import "theme/vars"` the candidates are, in order:
//!
//! ```text
//! theme/_vars.scss
//! theme/vars.scss
//! theme/_vars.sass
//! theme/vars.sass
//! theme/_vars.css
//! theme/vars.css
//! theme/vars
//! ```

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Module-style requests such as `~bootstrap` or `~@scope/pkg/`, which are
/// handed to the host resolver as they are.
static MODULE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^~([^/]+|[^/]+/|@[^/]+/[^/]+|@[^/]+/?|@[^/]+/[^/]+/)$").unwrap()
});

/// `@import`, `@use` and `@forward` rules, up to the end of the statement.
static IMPORT_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(import|use|forward)\s+([^;{}]+)").unwrap());

/// A single- or double-quoted string.
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).unwrap());

/// `url(...)` arguments of plain CSS imports.
static CSS_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"url\([^)]*\)").unwrap());

/// Block comments and whole-line `//` comments.
static IMPORT_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|(?m)^[ \t]*//[^\n]*$").unwrap());

/// Extensions tried, in order, for a request without one.
const SOURCE_EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

/// A single `@import`/`@use` seen by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// The URL exactly as written in the stylesheet
    pub url: String,
    /// Directory that relative candidates are resolved against
    pub base_dir: PathBuf,
}

impl ImportRequest {
    pub fn new(url: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            base_dir: base_dir.into(),
        }
    }
}

/// Convert an import URL into a request path.
///
/// A leading `~` marks a module request and is dropped; everything else is
/// returned unchanged.
pub fn url_to_request(url: &str) -> &str {
    url.strip_prefix('~').unwrap_or(url)
}

/// List every file name the compiler convention allows for `url`.
///
/// Plain CSS imports (`.css`) produce no candidates since SASS leaves them
/// untouched. The raw request is always tried last so alias roots still get
/// a chance to match. Duplicates are removed, keeping the first position.
pub fn imports_to_resolve(url: &str) -> Vec<String> {
    let request = url_to_request(url);

    if MODULE_IMPORT.is_match(url) {
        return dedup(vec![request.to_string(), url.to_string()]);
    }

    let (dirname, basename) = match request.rsplit_once('/') {
        Some((dir, base)) => (dir, base),
        None => ("", request),
    };
    let is_partial = basename.starts_with('_');

    let mut candidates = Vec::new();
    match extension_of(basename).as_deref() {
        Some("css") => return candidates,
        Some("scss" | "sass") => {
            if !is_partial {
                candidates.push(join_request(dirname, &format!("_{basename}")));
            }
            candidates.push(request.to_string());
        }
        _ => {
            for ext in SOURCE_EXTENSIONS {
                if !is_partial {
                    candidates.push(join_request(dirname, &format!("_{basename}.{ext}")));
                }
                candidates.push(join_request(dirname, &format!("{basename}.{ext}")));
            }
            candidates.push(request.to_string());
        }
    }

    dedup(candidates)
}

/// URLs of the `@import`, `@use` and `@forward` rules in `source`, as
/// written and in order of appearance.
///
/// Plain CSS imports (`url(...)`, remote URLs, `.css` files) and built-in
/// `sass:` modules are left out since the compiler never resolves them.
pub fn import_urls(source: &str) -> Vec<String> {
    let stripped = IMPORT_COMMENT.replace_all(source, "");
    let mut urls = Vec::new();

    for rule in IMPORT_RULE.captures_iter(&stripped) {
        let arguments = CSS_URL.replace_all(&rule[2], "");
        let quoted = QUOTED
            .captures_iter(&arguments)
            .filter_map(|quote| quote.get(1).or_else(|| quote.get(2)))
            .map(|url| url.as_str().to_string());

        // `@use` and `@forward` take one URL followed by modifiers.
        let take = if &rule[1] == "import" { usize::MAX } else { 1 };
        urls.extend(quoted.take(take).filter(|url| needs_resolution(url)));
    }

    dedup(urls)
}

fn needs_resolution(url: &str) -> bool {
    let plain_css = url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("//")
        || extension_of(url).as_deref() == Some("css");
    !plain_css && !url.starts_with("sass:")
}

/// Resolve `target` against `base`, normalizing `.` and `..` lexically.
///
/// Absolute targets ignore the base, matching how path resolution behaves
/// for absolute imports.
pub fn resolve_path(base: &Path, target: impl AsRef<Path>) -> PathBuf {
    let target = target.as_ref();
    if target.is_absolute() {
        normalize_path(target)
    } else {
        normalize_path(&base.join(target))
    }
}

/// Split a candidate into its first path segment and the remainder.
pub fn split_root(candidate: &str) -> (&str, &str) {
    candidate.split_once('/').unwrap_or((candidate, ""))
}

/// Remove `.` components and fold `..` into the preceding segment.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}

fn extension_of(basename: &str) -> Option<String> {
    Path::new(basename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn join_request(dirname: &str, file: &str) -> String {
    if dirname.is_empty() {
        file.to_string()
    } else {
        format!("{dirname}/{file}")
    }
}

fn dedup(candidates: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !seen.contains(&candidate) {
            seen.push(candidate);
        }
    }
    seen
}
