use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use logsieve_types::OptionKey;

/// Flat string key/value set describing a filter
///
/// Built from CLI flags, a `.properties` file or a TOML file. Values stay raw
/// strings until they are resolved into a `FilterConfig`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one for this exact key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up an option under any of its spellings, canonical first
    pub fn lookup(&self, key: OptionKey) -> Option<&str> {
        key.spellings().find_map(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse Java-style `.properties` text
    ///
    /// Supports `key=value`, `key: value` and `key value` entries, `#` and `!`
    /// comment lines, backslash escapes and trailing-backslash line
    /// continuations. Later duplicates win.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        let mut logical = String::new();
        let mut continuing = false;

        for line in text.lines() {
            if continuing {
                logical.push_str(line.trim_start());
            } else {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                logical.push_str(trimmed);
            }

            if ends_with_continuation(&logical) {
                logical.pop();
                continuing = true;
                continue;
            }

            continuing = false;
            let (key, value) = split_entry(&logical);
            props.insert(key, value);
            logical.clear();
        }

        // Continuation on the last line
        if !logical.is_empty() {
            let (key, value) = split_entry(&logical);
            props.insert(key, value);
        }

        props
    }

    /// Parse a TOML document, flattening nested tables into dotted keys
    ///
    /// Arrays are joined with `,` so `keywords = ["ERROR", "WARN"]` reads the
    /// same as `keywords=ERROR,WARN` in a properties file.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = text.parse()?;
        let mut props = Self::new();
        flatten_toml("", &table, &mut props);
        Ok(props)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

/// An odd number of trailing backslashes continues the entry on the next line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line into key and value
fn split_entry(line: &str) -> (String, String) {
    let mut chars = line.chars().peekable();
    let mut key = String::new();
    let mut separator_seen = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => push_escaped(&mut chars, &mut key),
            '=' | ':' => {
                separator_seen = true;
                break;
            }
            c if c.is_whitespace() => break,
            c => key.push(c),
        }
    }

    skip_whitespace(&mut chars);
    if !separator_seen && chars.next_if(|c| *c == '=' || *c == ':').is_some() {
        skip_whitespace(&mut chars);
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            push_escaped(&mut chars, &mut value);
        } else {
            value.push(c);
        }
    }

    (key, value)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// Decode the character following a backslash
fn push_escaped(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    let Some(c) = chars.next() else {
        return;
    };
    match c {
        't' => out.push('\t'),
        'n' => out.push('\n'),
        'r' => out.push('\r'),
        'f' => out.push('\u{0C}'),
        'u' => {
            let hex: String = chars.by_ref().take(4).collect();
            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                Some(decoded) => out.push(decoded),
                None => {
                    out.push('u');
                    out.push_str(&hex);
                }
            }
        }
        other => out.push(other),
    }
}

fn flatten_toml(prefix: &str, table: &toml::Table, props: &mut Properties) {
    for (key, value) in table {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            toml::Value::Table(inner) => flatten_toml(&name, inner, props),
            toml::Value::Array(items) => {
                let joined = items.iter().map(toml_scalar).collect::<Vec<_>>().join(",");
                props.insert(name, joined);
            }
            other => {
                props.insert(name, toml_scalar(other));
            }
        }
    }
}

fn toml_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsieve_types::{KEYWORDS, LOG_WAIT, PROP_MONITOR_INTERVAL};

    #[test]
    fn test_parse_separators_and_comments() {
        let props = Properties::parse(
            "# filter settings\n\
             ! legacy comment\n\
             keywords=ERROR,WARN\n\
             logwait : true\n\
             logwaittime 30\n\
             \n\
             empty=\n",
        );

        assert_eq!(props.len(), 4);
        assert_eq!(props.get("keywords"), Some("ERROR,WARN"));
        assert_eq!(props.get("logwait"), Some("true"));
        assert_eq!(props.get("logwaittime"), Some("30"));
        assert_eq!(props.get("empty"), Some(""));
    }

    #[test]
    fn test_parse_continuation_lines() {
        let props = Properties::parse("keywords = ERROR,\\\n    FATAL,\\\n    # not a comment\n");
        assert_eq!(props.get("keywords"), Some("ERROR,FATAL,# not a comment"));
    }

    #[test]
    fn test_parse_escapes() {
        let props = Properties::parse("path\\ name=C\\:\\\\logs\nsnow=\\u2603\n");
        assert_eq!(props.get("path name"), Some("C:\\logs"));
        assert_eq!(props.get("snow"), Some("\u{2603}"));
    }

    #[test]
    fn test_parse_later_duplicate_wins() {
        let props = Properties::parse("keywords=A\nkeywords=B\n");
        assert_eq!(props.get("keywords"), Some("B"));
    }

    #[test]
    fn test_lookup_prefers_canonical_spelling() {
        let props = Properties::new()
            .with("logwait", "false")
            .with("log_wait", "true");
        assert_eq!(props.lookup(LOG_WAIT), Some("true"));

        let props = Properties::new().with("prop.monitor.rollInterval", "10");
        assert_eq!(props.lookup(PROP_MONITOR_INTERVAL), Some("10"));
        assert_eq!(props.lookup(KEYWORDS), None);
    }

    #[test]
    fn test_from_toml_flattens() {
        let props = Properties::from_toml(
            r#"
keywords = ["ERROR", "FATAL"]
log_wait = true
log_wait_time = 5

[prop.monitor]
rollInterval = 100
"#,
        )
        .unwrap();

        assert_eq!(props.get("keywords"), Some("ERROR,FATAL"));
        assert_eq!(props.get("log_wait"), Some("true"));
        assert_eq!(props.get("log_wait_time"), Some("5"));
        assert_eq!(props.lookup(PROP_MONITOR_INTERVAL), Some("100"));
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(Properties::from_toml("keywords = [").is_err());
    }
}
