//! Cache operation verbs

use std::fmt;
use std::str::FromStr;

use crate::domain::DomainError;

/// Operations a repository exposes for every logical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Regenerate,
    Invalidate,
}

impl CacheOperation {
    pub const ALLOWED: [&'static str; 3] = ["get", "regenerate", "invalidate"];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::Regenerate => "regenerate",
            CacheOperation::Invalidate => "invalidate",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheOperation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(CacheOperation::Get),
            "regenerate" => Ok(CacheOperation::Regenerate),
            "invalidate" => Ok(CacheOperation::Invalidate),
            _ => Err(DomainError::unknown_operation(s, Self::ALLOWED.to_vec())),
        }
    }
}
