//! Normalizes code and query text into comparable BM25 terms.
//!
//! Shared by the Chunker (token streams attached to Chunks) and by the BM25
//! index (query tokenization), so the vocabulary cannot drift between build
//! time and query time.

const STOP_WORDS: &[&str] = &[
    // programming keywords
    "def", "class", "self", "return", "if", "else", "elif", "for", "while", "try", "except",
    "finally", "with", "as", "import", "from", "and", "or", "not", "true", "false", "none",
    "function", "const", "let", "var", "this", "new", "async", "await", "in", "is",
    // common English stopwords
    "the", "a", "an", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "can", "need", "to",
    "of", "for", "on", "with", "at", "by", "from", "into", "through", "during", "before",
    "after", "but", "if", "because", "until", "while", "that", "these", "those", "i", "me",
    "my", "we", "you", "your", "it", "its", "they", "them", "their", "what", "which", "who",
    "how", "where", "when", "why", "add", "create", "make", "build", "implement", "write",
    "fix", "update", "change", "modify", "remove", "delete",
];

/// Extract maximal word-character runs, split each on snake_case and
/// camelCase boundaries, lowercase the result, then drop stop words and
/// tokens shorter than 3 chars.
///
/// Deterministic, case-insensitive, and idempotent after a trivial re-join:
/// `tokenize(tokenize(x).join(" ")) == tokenize(x)`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in word_runs(text) {
        split_word(&word, &mut tokens);
    }
    tokens
        .into_iter()
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 2 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Equivalent of Python's `re.findall(r'\b\w+\b', text)`, case preserved.
fn word_runs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            cur.push(ch);
        } else if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Split a single word on underscore boundaries, else on camelCase
/// boundaries (a break before an uppercase letter followed by a lowercase
/// one, and between a run of uppercase letters and a trailing lowercase run).
fn split_word(word: &str, out: &mut Vec<String>) {
    if word.contains('_') {
        for part in word.split('_') {
            if !part.is_empty() {
                out.push(part.to_string());
            }
        }
        return;
    }

    let chars: Vec<char> = word.chars().collect();
    if !chars.iter().skip(1).any(|c| c.is_uppercase()) {
        out.push(word.to_string());
        return;
    }

    let mut parts: Vec<String> = Vec::new();
    let mut cur = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(p) if c.is_uppercase() && p.is_lowercase() => true,
            Some(p) if c.is_uppercase() && p.is_uppercase() && next.is_some_and(|n| n.is_lowercase()) => true,
            _ => false,
        };
        if boundary && !cur.is_empty() {
            parts.push(std::mem::take(&mut cur));
        }
        cur.push(c);
    }
    if !cur.is_empty() {
        parts.push(cur);
    }
    out.extend(parts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_snake_case() {
        assert_eq!(tokenize("get_user_name"), vec!["get", "user", "name"]);
    }

    #[test]
    fn splits_camel_case() {
        assert_eq!(tokenize("getUserName"), vec!["get", "user", "name"]);
    }

    #[test]
    fn splits_acronym_then_lowercase_run() {
        assert_eq!(tokenize("parseHTTPResponse"), vec!["parse", "http", "response"]);
    }

    #[test]
    fn drops_short_and_stop_words() {
        assert_eq!(tokenize("a to if foo"), vec!["foo"]);
    }

    #[test]
    fn idempotent_after_rejoin() {
        let t1 = tokenize("fetchUserProfile_data");
        let rejoined = t1.join(" ");
        let t2 = tokenize(&rejoined);
        assert_eq!(t1, t2);
    }

    #[test]
    fn preserves_duplicates() {
        assert_eq!(tokenize("foo foo foo"), vec!["foo", "foo", "foo"]);
    }
}
