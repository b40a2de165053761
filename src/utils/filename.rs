use std::path::Path;

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// Characters that are not allowed in file names across common filesystems
/// and object-key contexts.
const SPECIAL_CHARACTERS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extensions longer than this are replaced with [`SENTINEL_EXTENSION`].
const MAX_EXTENSION_LEN: usize = 15;

/// Fallback extension for missing filenames and pathological extensions.
pub const SENTINEL_EXTENSION: &str = ".incorrect";

fn remove_special_characters(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !SPECIAL_CHARACTERS.contains(c))
        .collect()
}

fn normalize_string_value(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.nfkc().collect()
}

fn clean_once(filename: &str) -> String {
    normalize_string_value(&remove_special_characters(filename))
}

/// Remove `garbage` characters that cause problems with file names.
///
/// Strips characters illegal on common filesystems, collapses whitespace runs
/// to single spaces, trims, and applies Unicode NFKC normalization. NFKC can
/// surface characters the strip pass already handled (e.g. U+FE56 normalizes
/// to `?`), so the pipeline is re-applied until it settles, keeping the whole
/// transform idempotent.
pub fn clean_filename(filename: &str) -> String {
    let mut current = filename.to_string();
    for _ in 0..4 {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Build a random filename that keeps the original extension, like
/// `9841422d-c041-45a5-b7b3-467179f4f127.jpg`.
///
/// The extension is lowercased. Extensions longer than 15 characters are
/// replaced with the sentinel extension to defend against key-injection via
/// pathological "extensions".
pub fn random_filename(filename: &str) -> String {
    let stem = Uuid::new_v4().to_string();
    let ext = match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = format!(".{}", ext.to_lowercase());
            if ext.len() > MAX_EXTENSION_LEN {
                SENTINEL_EXTENSION.to_string()
            } else {
                ext
            }
        }
        None => String::new(),
    };
    format!("{stem}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_filename_strips_special_characters() {
        assert_eq!(clean_filename("re<po>rt:2024.pdf"), "report2024.pdf");
        assert_eq!(clean_filename("a/b\\c|d?e*f.txt"), "abcdef.txt");
    }

    #[test]
    fn test_clean_filename_collapses_whitespace() {
        assert_eq!(clean_filename("  my   report\t2024 .pdf "), "my report 2024 .pdf");
    }

    #[test]
    fn test_clean_filename_normalizes_unicode() {
        // U+FB01 LATIN SMALL LIGATURE FI decomposes to "fi" under NFKC.
        assert_eq!(clean_filename("\u{fb01}le.txt"), "file.txt");
    }

    #[test]
    fn test_clean_filename_is_idempotent() {
        let inputs = [
            "report.pdf",
            "  a   b?c.txt  ",
            "\u{fb01}le.txt",
            // U+FE56 SMALL QUESTION MARK normalizes to '?' under NFKC, which
            // the strip pass must then remove on the next round.
            "name\u{fe56}.txt",
            "",
        ];
        for input in inputs {
            let once = clean_filename(input);
            assert_eq!(clean_filename(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_random_filename_keeps_lowercased_extension() {
        let name = random_filename("photo.JPG");
        assert!(name.ends_with(".jpg"), "{name}");
    }

    #[test]
    fn test_random_filename_without_extension() {
        let name = random_filename("README");
        assert!(!name.contains('.'), "{name}");
    }

    #[test]
    fn test_random_filename_replaces_pathological_extension() {
        let name = random_filename("payload.aaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(name.ends_with(SENTINEL_EXTENSION), "{name}");
    }
}
