//! # Object Key Policy
//!
//! Derives the storage key ("object name") of an upload. Generated keys are
//! partitioned by the current date, `yyyy/MM/dd/<uuid>.<suffix>`, so objects
//! of one day share a prefix and two uploads never collide.
use chrono::Local;
use uuid::Uuid;

/// Format of the date partition of a generated key.
const DATE_PARTITION: &str = "%Y/%m/%d";

/// Returns `explicit` unchanged when it is non-empty, otherwise generates a
/// date-partitioned key with the given suffix.
#[must_use]
pub fn resolve(suffix: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => generate(suffix),
    }
}

/// Generates a fresh `yyyy/MM/dd/<uuid>.<suffix>` key.
///
/// An empty suffix yields `yyyy/MM/dd/<uuid>`.
#[must_use]
pub fn generate(suffix: &str) -> String {
    let date = Local::now().format(DATE_PARTITION);
    let token = Uuid::new_v4();
    if suffix.is_empty() {
        format!("{date}/{token}")
    } else {
        format!("{date}/{token}.{suffix}")
    }
}

/// Places `name` under `dir`. Separators are not normalized.
#[must_use]
pub fn with_dir(dir: Option<&str>, name: String) -> String {
    match dir {
        Some(dir) if !dir.is_empty() => format!("{dir}/{name}"),
        _ => name,
    }
}

/// The text after the last `.` of a filename, empty when there is none.
#[must_use]
pub fn suffix_of(filename: &str) -> &str {
    filename.rsplit_once('.').map_or("", |(_, suffix)| suffix)
}

/// The key as handed to a backend client: one leading `/` removed.
#[must_use]
pub fn normalize(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use regex::Regex;
    use rstest::rstest;

    use super::*;

    fn key_pattern(suffix: &str) -> Regex {
        let today = Local::now().format(DATE_PARTITION).to_string();
        Regex::new(&format!(
            "^{}/[0-9a-f]{{8}}-[0-9a-f]{{4}}-4[0-9a-f]{{3}}-[89ab][0-9a-f]{{3}}-[0-9a-f]{{12}}\\.{}$",
            regex::escape(&today),
            regex::escape(suffix)
        ))
        .unwrap()
    }

    #[rstest]
    #[case("png")]
    #[case("tar.gz")]
    #[case("TXT")]
    fn generated_key_is_date_partitioned(#[case] suffix: &str) {
        let key = resolve(suffix, None);
        assert!(key_pattern(suffix).is_match(&key), "unexpected key {key}");
    }

    #[rstest]
    #[case("png", "x")]
    #[case("jpg", "avatars/1.jpg")]
    #[case("", "/leading/slash.bin")]
    fn explicit_key_is_returned_unchanged(#[case] suffix: &str, #[case] explicit: &str) {
        assert_eq!(resolve(suffix, Some(explicit)), explicit);
    }

    #[test]
    fn empty_explicit_key_generates() {
        let key = resolve("pdf", Some(""));
        assert!(key_pattern("pdf").is_match(&key));
    }

    #[test]
    fn empty_suffix_has_no_trailing_dot() {
        let key = generate("");
        assert!(!key.ends_with('.'));
        assert_eq!(key.split('/').count(), 4);
    }

    #[test]
    fn generated_keys_do_not_collide() {
        let keys: HashSet<String> = (0..10_000).map(|_| generate("bin")).collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[rstest]
    #[case(Some("docs"), "a.txt", "docs/a.txt")]
    #[case(Some("docs/"), "a.txt", "docs//a.txt")]
    #[case(Some(""), "a.txt", "a.txt")]
    #[case(None, "a.txt", "a.txt")]
    fn can_place_under_dir(#[case] dir: Option<&str>, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(with_dir(dir, name.to_string()), expected);
    }

    #[rstest]
    #[case("photo.png", "png")]
    #[case("archive.tar.gz", "gz")]
    #[case("README", "")]
    #[case("trailing.", "")]
    fn can_extract_suffix(#[case] filename: &str, #[case] expected: &str) {
        assert_eq!(suffix_of(filename), expected);
    }

    #[test]
    fn normalize_strips_one_leading_separator() {
        assert_eq!(normalize("/a/b.txt"), "a/b.txt");
        assert_eq!(normalize("//a"), "/a");
        assert_eq!(normalize("a"), "a");
    }
}
