use regex::bytes::Regex;

use logsieve_types::parse_keywords;

/// Case-sensitive substring matcher over an ordered keyword set
///
/// Keywords are escaped and compiled into a single alternation so one scan of
/// the payload answers the question for every keyword. Payloads are raw bytes
/// and need not be valid UTF-8.
#[derive(Clone, Default)]
pub struct KeywordMatcher {
    /// Compiled alternation (None = no keywords, matches nothing)
    regex: Option<Regex>,

    /// Keywords in configured order
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Compile a matcher for the given keywords
    ///
    /// Empty keywords are skipped; an empty substring would match everything.
    pub fn new<I, S>(keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let regex = if keywords.is_empty() {
            None
        } else {
            let pattern = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&pattern)?)
        };

        Ok(Self { regex, keywords })
    }

    /// Compile a matcher from a comma-separated keyword list
    pub fn parse(list: &str) -> Result<Self, regex::Error> {
        Self::new(parse_keywords(list))
    }

    /// A matcher with no keywords
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if the payload contains any keyword
    pub fn matches(&self, payload: &[u8]) -> bool {
        match &self.regex {
            Some(re) => re.is_match(payload),
            None => false,
        }
    }

    /// The keyword occurring leftmost in the payload
    pub fn first_match(&self, payload: &[u8]) -> Option<&str> {
        let found = self.regex.as_ref()?.find(payload)?;
        self.keywords
            .iter()
            .find(|k| k.as_bytes() == found.as_bytes())
            .map(String::as_str)
    }

    /// Byte spans of every non-overlapping keyword occurrence
    pub fn find_matches(&self, payload: &[u8]) -> Vec<(usize, usize)> {
        match &self.regex {
            Some(re) => re.find_iter(payload).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Check if the matcher has no keywords (matches nothing)
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

impl std::fmt::Debug for KeywordMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordMatcher")
            .field("keywords", &self.keywords)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match() {
        let matcher = KeywordMatcher::new(["ERROR", "FATAL"]).unwrap();
        assert!(matcher.matches(b"2024-01-01 ERROR disk full"));
        assert!(matcher.matches(b"FATAL"));
        assert!(matcher.matches(b"xxERRORxx"));
        assert!(!matcher.matches(b"INFO all good"));
    }

    #[test]
    fn test_case_sensitive() {
        let matcher = KeywordMatcher::new(["ERROR"]).unwrap();
        assert!(!matcher.matches(b"error lowercase"));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let matcher = KeywordMatcher::empty();
        assert!(matcher.is_empty());
        assert!(!matcher.matches(b""));
        assert!(!matcher.matches(b"anything at all"));

        let matcher = KeywordMatcher::parse(" , ,").unwrap();
        assert!(matcher.is_empty());
        assert!(!matcher.matches(b"anything"));

        let matcher = KeywordMatcher::new([""]).unwrap();
        assert!(!matcher.matches(b"anything"));
    }

    #[test]
    fn test_keywords_are_literals() {
        let matcher = KeywordMatcher::new(["a.c", "(x)"]).unwrap();
        assert!(matcher.matches(b"the a.c unit"));
        assert!(!matcher.matches(b"abc"));
        assert!(matcher.matches(b"f(x) = 1"));
        assert!(!matcher.matches(b"x"));
    }

    #[test]
    fn test_non_utf8_payload() {
        let matcher = KeywordMatcher::new(["ERR"]).unwrap();
        assert!(matcher.matches(&[0xff, 0xfe, b'E', b'R', b'R', 0x00]));
        assert!(!matcher.matches(&[0xff, 0xfe, 0x00]));
    }

    #[test]
    fn test_order_does_not_change_result() {
        let forward = KeywordMatcher::new(["WARN", "ERROR"]).unwrap();
        let backward = KeywordMatcher::new(["ERROR", "WARN"]).unwrap();
        for payload in [&b"WARN x"[..], &b"ERROR y"[..], &b"WARN ERROR"[..], &b"INFO"[..]] {
            assert_eq!(forward.matches(payload), backward.matches(payload));
        }
    }

    #[test]
    fn test_first_match_is_leftmost() {
        let matcher = KeywordMatcher::new(["WARN", "ERROR"]).unwrap();
        assert_eq!(matcher.first_match(b"ERROR then WARN"), Some("ERROR"));
        assert_eq!(matcher.first_match(b"WARN then ERROR"), Some("WARN"));
        assert_eq!(matcher.first_match(b"INFO"), None);
    }

    #[test]
    fn test_find_matches() {
        let matcher = KeywordMatcher::new(["error"]).unwrap();
        let matches = matcher.find_matches(b"an error occurred, another error here");
        assert_eq!(matches, vec![(3, 8), (27, 32)]);
    }

    #[test]
    fn test_parse_keeps_order() {
        let matcher = KeywordMatcher::parse("FATAL, ERROR,FATAL").unwrap();
        assert_eq!(matcher.keywords(), ["FATAL", "ERROR"]);
    }
}
