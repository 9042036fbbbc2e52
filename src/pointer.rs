//! JSON Pointer (RFC 6901) addressing within schema documents.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};
use serde_json::Value;

/// A single reference token: an object property or an array index.
#[derive(Debug, Clone)]
pub enum Token {
    Property(String),
    Index(usize),
}

/// Tokens compare by what they address, so `"0"` and index `0` are equal.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum TokenKey<'a> {
    Index(usize),
    Text(&'a str),
}

impl Token {
    fn key(&self) -> TokenKey<'_> {
        match self {
            Token::Index(index) => TokenKey::Index(*index),
            Token::Property(name) => match canonical_index(name) {
                Some(index) => TokenKey::Index(index),
                None => TokenKey::Text(name),
            },
        }
    }

    /// Returns the property name, if this token is one.
    pub fn as_property(&self) -> Option<&str> {
        match self {
            Token::Property(name) => Some(name),
            Token::Index(_) => None,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Property(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Property(value)
    }
}

impl From<usize> for Token {
    fn from(value: usize) -> Self {
        Token::Index(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Index(index) => write!(f, "{}", index),
            Token::Property(name) => f.write_str(&name.replace('~', "~0").replace('/', "~1")),
        }
    }
}

fn canonical_index(text: &str) -> Option<usize> {
    if text.is_empty() || (text.len() > 1 && text.starts_with('0')) {
        return None;
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Ordered sequence of tokens. The empty pointer is the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer(Vec<Token>);

/// Error returned when a string is not a valid JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid JSON Pointer: {0}")]
pub struct PointerParseError(pub String);

impl Pointer {
    /// The root pointer.
    pub fn root() -> Self {
        Pointer(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn last(&self) -> Option<&Token> {
        self.0.last()
    }

    pub fn push(&mut self, token: impl Into<Token>) {
        self.0.push(token.into());
    }

    pub fn pop(&mut self) -> Option<Token> {
        self.0.pop()
    }

    /// Returns a new pointer with `token` appended.
    pub fn join(&self, token: impl Into<Token>) -> Pointer {
        let mut tokens = self.0.clone();
        tokens.push(token.into());
        Pointer(tokens)
    }

    /// Returns a new pointer with every token of `other` appended.
    pub fn concat(&self, other: &Pointer) -> Pointer {
        let mut tokens = self.0.clone();
        tokens.extend(other.0.iter().cloned());
        Pointer(tokens)
    }

    /// The pointer one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Pointer> {
        if self.0.is_empty() {
            None
        } else {
            Some(Pointer(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The remainder of this pointer after `prefix`.
    pub fn strip_prefix(&self, prefix: &Pointer) -> Option<Pointer> {
        if self.starts_with(prefix) {
            Some(Pointer(self.0[prefix.0.len()..].to_vec()))
        } else {
            None
        }
    }

    /// Parse an RFC 6901 string such as `/properties/foo~1bar`.
    pub fn parse(text: &str) -> Result<Pointer, PointerParseError> {
        if text.is_empty() {
            return Ok(Pointer::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PointerParseError(text.to_string()));
        };

        let mut tokens = Vec::new();
        for raw in rest.split('/') {
            let mut unescaped = String::with_capacity(raw.len());
            let mut chars = raw.chars();
            while let Some(c) = chars.next() {
                if c == '~' {
                    match chars.next() {
                        Some('0') => unescaped.push('~'),
                        Some('1') => unescaped.push('/'),
                        _ => return Err(PointerParseError(text.to_string())),
                    }
                } else {
                    unescaped.push(c);
                }
            }
            tokens.push(Token::Property(unescaped));
        }
        Ok(Pointer(tokens))
    }

    /// Read the value this pointer addresses.
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for token in &self.0 {
            current = match (current, token) {
                (Value::Object(map), Token::Property(name)) => map.get(name)?,
                (Value::Object(map), Token::Index(index)) => map.get(&index.to_string())?,
                (Value::Array(items), token) => items.get(array_index(token)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable variant of [`Pointer::get`].
    pub fn get_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = document;
        for token in &self.0 {
            current = match (current, token) {
                (Value::Object(map), Token::Property(name)) => map.get_mut(name)?,
                (Value::Object(map), Token::Index(index)) => map.get_mut(&index.to_string())?,
                (Value::Array(items), token) => items.get_mut(array_index(token)?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn array_index(token: &Token) -> Option<usize> {
    match token {
        Token::Index(index) => Some(*index),
        Token::Property(name) => canonical_index(name),
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "/{}", token)?;
        }
        Ok(())
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<T: Into<Token>> FromIterator<T> for Pointer {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Pointer(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_escapes_tokens() {
        let pointer: Pointer = ["properties", "a/b", "c~d"].into_iter().collect();
        assert_eq!(pointer.to_string(), "/properties/a~1b/c~0d");
        assert_eq!(Pointer::root().to_string(), "");
    }

    #[test]
    fn parse_roundtrips_escapes() {
        let pointer = Pointer::parse("/properties/a~1b/c~0d").unwrap();
        assert_eq!(pointer.len(), 3);
        assert_eq!(pointer.tokens()[1].as_property(), Some("a/b"));
        assert_eq!(pointer.tokens()[2].as_property(), Some("c~d"));
    }

    #[test]
    fn parse_rejects_missing_slash() {
        assert!(Pointer::parse("properties").is_err());
        assert!(Pointer::parse("/bad~2escape").is_err());
    }

    #[test]
    fn numeric_property_equals_index() {
        let parsed = Pointer::parse("/allOf/0").unwrap();
        let built = Pointer::root().join("allOf").join(0usize);
        assert_eq!(parsed, built);
    }

    #[test]
    fn leading_zero_is_not_an_index() {
        let parsed = Pointer::parse("/allOf/01").unwrap();
        let built = Pointer::root().join("allOf").join(1usize);
        assert_ne!(parsed, built);
    }

    #[test]
    fn get_reads_objects_and_arrays() {
        let document = json!({"allOf": [{"type": "string"}, true]});
        let pointer = Pointer::parse("/allOf/0/type").unwrap();
        assert_eq!(pointer.get(&document), Some(&json!("string")));
        assert_eq!(
            Pointer::root().join("allOf").join(1usize).get(&document),
            Some(&json!(true))
        );
        assert!(Pointer::parse("/allOf/2").unwrap().get(&document).is_none());
    }

    #[test]
    fn get_mut_writes_in_place() {
        let mut document = json!({"properties": {"foo": {}}});
        let pointer = Pointer::parse("/properties/foo").unwrap();
        *pointer.get_mut(&mut document).unwrap() = json!(false);
        assert_eq!(document, json!({"properties": {"foo": false}}));
    }

    #[test]
    fn parent_and_prefix() {
        let pointer = Pointer::parse("/properties/foo/items").unwrap();
        let prefix = Pointer::parse("/properties").unwrap();
        assert_eq!(pointer.parent(), Some(Pointer::parse("/properties/foo").unwrap()));
        assert!(pointer.starts_with(&prefix));
        assert_eq!(
            pointer.strip_prefix(&prefix),
            Some(Pointer::parse("/foo/items").unwrap())
        );
        assert_eq!(Pointer::root().parent(), None);
    }
}
