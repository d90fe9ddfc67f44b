use regex::Regex;
use std::sync::LazyLock;

static RE_PLAIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*$").unwrap());
static RE_DIGIT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9_.-][A-Za-z0-9_.-]*$").unwrap());
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Turn an author id into a valid XML/HTML id attribute.
///
/// Plain ids pass through, ids starting with a digit or punctuation get an
/// `id_` prefix and anything else is percent-encoded with `_` in place of `%`.
pub fn norm_id(id: &str) -> String {
    if RE_PLAIN_ID.is_match(id) {
        return id.to_string();
    }
    if RE_DIGIT_ID.is_match(id) {
        return format!("id_{}", id);
    }
    let mut out = String::from("id_");
    for b in id.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'*' => out.push(b as char),
            b'_' => out.push('_'),
            b' ' => out.push('-'),
            _ => out.push_str(&format!("_{:02X}", b)),
        }
    }
    out
}

/// Whitespace collapsed to `_`, for label-like keys used by LaTeX and RST.
pub fn norm_label(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), "_").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_id_plain() {
        assert_eq!(norm_id("sample-1.2_x"), "sample-1.2_x");
    }

    #[test]
    fn test_norm_id_leading_digit() {
        assert_eq!(norm_id("1-2"), "id_1-2");
        assert_eq!(norm_id("_x"), "id__x");
    }

    #[test]
    fn test_norm_id_encodes_other_chars() {
        assert_eq!(norm_id("a b"), "id_a-b");
        assert_eq!(norm_id("図"), "id__E5_9B_B3");
    }

    #[test]
    fn test_norm_label() {
        assert_eq!(norm_label(" Hello  World "), "Hello_World");
    }
}
