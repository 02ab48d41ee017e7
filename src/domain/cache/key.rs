//! Storage key derivation

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

/// Prefix used when a repository doesn't configure its own
pub const DEFAULT_PREFIX: &str = "redisRepo";

/// Types that can stand in for themselves inside a storage key
pub trait KeyIdentity {
    /// Returns the stable identity (e.g. a database id), if the value has one
    fn key_identity(&self) -> Option<String>;
}

/// One generator argument, as it takes part in key derivation
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// An object reduced to its identity, or its type name when it has none
    Object {
        identity: Option<String>,
        type_name: &'static str,
    },
}

impl KeyArg {
    /// Wraps an object that knows its own identity
    pub fn object<T: KeyIdentity + ?Sized>(value: &T) -> Self {
        Self::Object {
            identity: value.key_identity(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Canonical text form: booleans become `0`/`1`, objects their identity or type name
    pub fn canonical(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "1".to_string(),
            Self::Bool(false) => "0".to_string(),
            Self::Int(v) => v.to_string(),
            Self::UInt(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(v) => v.clone(),
            Self::Object {
                identity: Some(identity),
                ..
            } => identity.clone(),
            Self::Object {
                identity: None,
                type_name,
            } => (*type_name).to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for KeyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Parses command-line style input: booleans, then integers, then floats, else text
impl FromStr for KeyArg {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(v) = s.parse::<bool>() {
            return Ok(Self::Bool(v));
        }

        if let Ok(v) = s.parse::<i64>() {
            return Ok(Self::Int(v));
        }

        if let Ok(v) = s.parse::<f64>() {
            return Ok(Self::Float(v));
        }

        Ok(Self::Text(s.to_string()))
    }
}

impl From<bool> for KeyArg {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for KeyArg {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for KeyArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for KeyArg {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u64> for KeyArg {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<usize> for KeyArg {
    fn from(v: usize) -> Self {
        Self::UInt(v as u64)
    }
}

impl From<f64> for KeyArg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for KeyArg {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for KeyArg {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<KeyArg>> From<Option<T>> for KeyArg {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Builds `prefix:logicalKey[:argumentDigest]` storage keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    prefix: String,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl KeyDeriver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derives the storage key; the digest part is omitted when `args` is empty
    pub fn derive(&self, logical_key: &str, args: &[KeyArg]) -> String {
        if args.is_empty() {
            format!("{}:{}", self.prefix, logical_key)
        } else {
            format!("{}:{}:{}", self.prefix, logical_key, Self::digest(args))
        }
    }

    /// SHA-256 over the length-prefixed canonical forms, hex encoded
    pub fn digest(args: &[KeyArg]) -> String {
        let mut hasher = Sha256::new();
        hasher.update((args.len() as u64).to_be_bytes());

        for arg in args {
            let canonical = arg.canonical();
            hasher.update((canonical.len() as u64).to_be_bytes());
            hasher.update(canonical.as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Article {
        id: Option<u64>,
    }

    impl KeyIdentity for Article {
        fn key_identity(&self) -> Option<String> {
            self.id.map(|id| id.to_string())
        }
    }

    #[test]
    fn test_key_without_arguments_has_no_digest() {
        let deriver = KeyDeriver::default();
        assert_eq!(deriver.derive("LatestArticles", &[]), "redisRepo:LatestArticles");
    }

    #[test]
    fn test_key_with_arguments_appends_digest() {
        let deriver = KeyDeriver::new("blog");
        let key = deriver.derive("ArticlesByAuthor", &[KeyArg::from(42)]);

        let digest = key.strip_prefix("blog:ArticlesByAuthor:").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let deriver = KeyDeriver::default();
        let args = vec![KeyArg::from("ru"), KeyArg::from(10), KeyArg::from(true)];

        assert_eq!(
            deriver.derive("Feed", &args),
            deriver.derive("Feed", &args.clone())
        );
    }

    #[test]
    fn test_canonically_equal_arguments_share_a_key() {
        let deriver = KeyDeriver::default();

        let a = deriver.derive("Feed", &[KeyArg::from(true), KeyArg::from(7u32)]);
        let b = deriver.derive("Feed", &[KeyArg::from(1), KeyArg::from("7")]);

        assert_eq!(a, b);
    }

    #[test]
    fn test_different_logical_keys_differ() {
        let deriver = KeyDeriver::default();
        let args = [KeyArg::from(1)];

        assert_ne!(
            deriver.derive("LatestArticles", &args),
            deriver.derive("PopularArticles", &args)
        );
        assert_ne!(
            deriver.derive("LatestArticles", &[]),
            deriver.derive("PopularArticles", &[])
        );
    }

    #[test]
    fn test_argument_order_matters() {
        let deriver = KeyDeriver::default();

        assert_ne!(
            deriver.derive("Feed", &[KeyArg::from(1), KeyArg::from(2)]),
            deriver.derive("Feed", &[KeyArg::from(2), KeyArg::from(1)])
        );
    }

    #[test]
    fn test_argument_boundaries_are_preserved() {
        let deriver = KeyDeriver::default();

        assert_ne!(
            deriver.derive("Feed", &[KeyArg::from("ab"), KeyArg::from("c")]),
            deriver.derive("Feed", &[KeyArg::from("a"), KeyArg::from("bc")])
        );
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(KeyArg::from(false).canonical(), "0");
        assert_eq!(KeyArg::from(true).canonical(), "1");
        assert_eq!(KeyArg::Null.canonical(), "");
        assert_eq!(KeyArg::from(None::<i64>).canonical(), "");
        assert_eq!(KeyArg::from(2.5).canonical(), "2.5");
        assert_eq!(KeyArg::from(-3).canonical(), "-3");
    }

    #[test]
    fn test_object_uses_identity_then_type_name() {
        let saved = KeyArg::object(&Article { id: Some(15) });
        assert_eq!(saved.canonical(), "15");

        let unsaved = KeyArg::object(&Article { id: None });
        assert!(unsaved.canonical().ends_with("Article"));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("true".parse::<KeyArg>().unwrap(), KeyArg::Bool(true));
        assert_eq!("12".parse::<KeyArg>().unwrap(), KeyArg::Int(12));
        assert_eq!("1.5".parse::<KeyArg>().unwrap(), KeyArg::Float(1.5));
        assert_eq!(
            "hello".parse::<KeyArg>().unwrap(),
            KeyArg::Text("hello".to_string())
        );
    }
}
