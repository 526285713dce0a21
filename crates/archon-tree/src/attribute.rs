use crate::error::TreeError;
use std::fmt;

///
/// AttrArg
///
/// One comma-separated argument. Bare arguments (`unique`) have no key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttrArg {
    pub key: Option<String>,
    pub value: String,
}

impl AttrArg {
    #[must_use]
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }
}

///
/// Attribute
///
/// A parsed `@name(args)` annotation. `contents` keeps the raw text
/// between the parentheses.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub contents: String,
    pub args: Vec<AttrArg>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: String::new(),
            args: Vec::new(),
        }
    }

    /// Parse `@name`, `@name()` or `@name(a, k=v, k="quoted, text")`.
    pub fn parse(src: &str) -> Result<Self, TreeError> {
        let text = src.trim();
        let text = text.strip_prefix('@').unwrap_or(text);
        let invalid = |reason: &str| TreeError::Attribute {
            source_text: src.to_string(),
            reason: reason.to_string(),
        };

        let (name, contents) = match text.find('(') {
            None => (text, ""),
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("missing closing parenthesis"))?;
                (&text[..open], inner)
            }
        };

        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid("attribute name must be an identifier"));
        }

        let args = split_args(contents)
            .map_err(invalid)?
            .into_iter()
            .map(|part| parse_arg(&part))
            .collect();

        Ok(Self {
            name: name.to_string(),
            contents: contents.trim().to_string(),
            args,
        })
    }

    #[must_use]
    pub fn with_bare(mut self, value: impl Into<String>) -> Self {
        self.args.push(AttrArg::bare(value));
        self.contents = render_args(&self.args);
        self
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(AttrArg::keyed(key, value));
        self.contents = render_args(&self.args);
        self
    }

    /// Value of `key=value`, or an empty string for a bare `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match &arg.key {
            Some(k) if k == key => Some(arg.value.as_str()),
            None if arg.value == key => Some(""),
            _ => None,
        })
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// True for a bare `key` or `key=true`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("" | "true"))
    }

    /// The `index`-th argument when it is unkeyed.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .filter(|arg| arg.key.is_none())
            .map(|arg| arg.value.as_str())
    }

    /// Raw contents with surrounding whitespace and quotes removed.
    #[must_use]
    pub fn unquoted(&self) -> &str {
        self.contents.trim().trim_matches('"')
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}({})", self.name, self.contents)
    }
}

fn render_args(args: &[AttrArg]) -> String {
    args.iter()
        .map(|arg| match &arg.key {
            Some(k) => format!("{k}={}", arg.value),
            None => arg.value.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_args(contents: &str) -> Result<Vec<String>, &'static str> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut quoted = false;

    for c in contents.chars() {
        match c {
            '"' => quoted = !quoted,
            '(' | '[' | '{' if !quoted => depth += 1,
            ')' | ']' | '}' if !quoted => {
                depth = depth.checked_sub(1).ok_or("unbalanced brackets")?;
            }
            ',' if !quoted && depth == 0 => {
                parts.push(std::mem::take(&mut cur));
                continue;
            }
            _ => {}
        }
        cur.push(c);
    }

    if quoted {
        return Err("unterminated string");
    }
    if depth != 0 {
        return Err("unbalanced brackets");
    }
    parts.push(cur);

    Ok(parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect())
}

fn parse_arg(part: &str) -> AttrArg {
    match part.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() && !k.contains('"') => {
            AttrArg::keyed(k.trim(), v.trim().trim_matches('"'))
        }
        _ => AttrArg::bare(part.trim_matches('"')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_keyed_args() {
        let attr = Attribute::parse("@db(type=TEXT, unique)").expect("attribute should parse");

        assert_eq!(attr.name, "db");
        assert_eq!(attr.get("type"), Some("TEXT"));
        assert!(attr.flag("unique"));
        assert!(!attr.flag("index"));
        assert_eq!(attr.contents, "type=TEXT, unique");
    }

    #[test]
    fn quoted_values_keep_commas() {
        let attr = Attribute::parse(r#"@validate("min=3,max=10")"#).expect("attribute should parse");

        assert_eq!(attr.args.len(), 1);
        assert_eq!(attr.unquoted(), "min=3,max=10");
    }

    #[test]
    fn bare_attribute_has_no_args() {
        let attr = Attribute::parse("@secret").expect("attribute should parse");

        assert_eq!(attr.name, "secret");
        assert!(attr.args.is_empty());
        assert_eq!(attr.positional(0), None);
    }

    #[test]
    fn positional_skips_keyed_args() {
        let attr = Attribute::parse("@owner(billing)").expect("attribute should parse");
        assert_eq!(attr.positional(0), Some("billing"));

        let attr = Attribute::parse("@file(kind=pdf)").expect("attribute should parse");
        assert_eq!(attr.positional(0), None);
    }

    #[test]
    fn malformed_attributes_are_rejected() {
        for src in ["@db(type=TEXT", "@(x)", r#"@x("open)"#, "@x(a))"] {
            assert!(Attribute::parse(src).is_err(), "{src} should be rejected");
        }
    }

    #[test]
    fn builder_keeps_contents_in_sync() {
        let attr = Attribute::new("dto").with_arg("only", "true");

        assert_eq!(attr.to_string(), "@dto(only=true)");
        assert!(attr.flag("only"));
    }
}
