//! Fuzzy partial-ratio string scoring on top of `strsim`'s edit distance,
//! plus a cleaning/index-map helper used to re-locate matches in punctuated
//! text.

/// Score in `0..=100`: the best Levenshtein-similarity of `needle` against
/// any same-length window of `haystack`, normalized the way fuzzywuzzy's
/// `partial_ratio` does — the shorter string is the needle.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    partial_ratio_alignment(a, b).0
}

/// Like [`partial_ratio`] but also returns the best-aligning window of the
/// haystack, so callers can run a second, whole-string check against just
/// that window rather than the entire haystack.
pub fn partial_ratio_alignment(a: &str, b: &str) -> (u32, String) {
    let (needle, haystack) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if needle.is_empty() {
        return if haystack.is_empty() {
            (100, String::new())
        } else {
            (0, String::new())
        };
    }
    if haystack.len() < needle.len() {
        return (ratio(needle, haystack), haystack.to_string());
    }

    let needle_chars: Vec<char> = needle.chars().collect();
    let haystack_chars: Vec<char> = haystack.chars().collect();
    let window = needle_chars.len();

    let mut best = 0u32;
    let mut best_window = String::new();
    for start in 0..=(haystack_chars.len() - window) {
        let candidate: String = haystack_chars[start..start + window].iter().collect();
        let score = ratio(needle, &candidate);
        if score > best {
            best = score;
            best_window = candidate;
        }
        if best == 100 {
            break;
        }
    }
    (best, best_window)
}

/// Whole-string similarity in `0..=100`, derived from normalized Levenshtein
/// similarity (`strsim::normalized_levenshtein`).
pub fn ratio(a: &str, b: &str) -> u32 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u32
}

/// Lowercases and strips non-alphanumeric/non-space characters, returning
/// the cleaned text plus a map from each cleaned-char index back to its
/// byte offset in the original string. Used to recover true `(start, end)`
/// offsets in the punctuated buffer after a match is found in cleaned text.
pub fn clean_with_index_map(original: &str) -> (String, Vec<usize>) {
    let mut cleaned = String::with_capacity(original.len());
    let mut index_map = Vec::with_capacity(original.len());
    let mut prev_was_space = true;

    for (byte_offset, ch) in original.char_indices() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                cleaned.push(lower);
                index_map.push(byte_offset);
            }
            prev_was_space = false;
        } else if ch.is_whitespace() {
            if !prev_was_space {
                cleaned.push(' ');
                index_map.push(byte_offset);
                prev_was_space = true;
            }
        }
        // other punctuation is dropped entirely, contributing no index entry
    }

    while cleaned.ends_with(' ') {
        cleaned.pop();
        index_map.pop();
    }

    (cleaned, index_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_identical_strings_is_100() {
        assert_eq!(ratio("hello", "hello"), 100);
    }

    #[test]
    fn ratio_empty_strings_is_100() {
        assert_eq!(ratio("", ""), 100);
    }

    #[test]
    fn partial_ratio_finds_substring_match() {
        let score = partial_ratio("world", "hello world today");
        assert!(score >= 95, "expected near-perfect match, got {score}");
    }

    #[test]
    fn partial_ratio_is_order_independent() {
        let a = partial_ratio("rupert", "okay rupert take this down");
        let b = partial_ratio("okay rupert take this down", "rupert");
        assert_eq!(a, b);
    }

    #[test]
    fn clean_strips_punctuation_and_lowercases() {
        let (cleaned, _) = clean_with_index_map("Rupert, take THIS down!");
        assert_eq!(cleaned, "rupert take this down");
    }

    #[test]
    fn clean_index_map_resolves_back_to_original() {
        let original = "Hello,  world!";
        let (cleaned, index_map) = clean_with_index_map(original);
        assert_eq!(cleaned.len(), index_map.len());
        let world_pos = cleaned.find("world").unwrap();
        let orig_byte = index_map[world_pos];
        assert_eq!(&original[orig_byte..orig_byte + 5], "world");
    }
}
