//! The two workflow platforms and the conversion direction between them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    N8n,
    Make,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::N8n => "n8n",
            Platform::Make => "make",
        }
    }

    pub fn other(self) -> Platform {
        match self {
            Platform::N8n => Platform::Make,
            Platform::Make => Platform::N8n,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n8n" => Ok(Platform::N8n),
            "make" | "integromat" => Ok(Platform::Make),
            _ => Err(ConversionError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Which lookup table a conversion reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[serde(rename = "n8nToMake")]
    N8nToMake,
    #[serde(rename = "makeToN8n")]
    MakeToN8n,
}

impl Direction {
    /// `None` when both ends are the same platform.
    pub fn between(source: Platform, target: Platform) -> Option<Direction> {
        match (source, target) {
            (Platform::N8n, Platform::Make) => Some(Direction::N8nToMake),
            (Platform::Make, Platform::N8n) => Some(Direction::MakeToN8n),
            _ => None,
        }
    }

    pub fn source(&self) -> Platform {
        match self {
            Direction::N8nToMake => Platform::N8n,
            Direction::MakeToN8n => Platform::Make,
        }
    }

    pub fn target(&self) -> Platform {
        self.source().other()
    }

    pub fn reverse(&self) -> Direction {
        match self {
            Direction::N8nToMake => Direction::MakeToN8n,
            Direction::MakeToN8n => Direction::N8nToMake,
        }
    }

    /// Key of this direction's table in a serialized mapping database.
    pub fn table_key(&self) -> &'static str {
        match self {
            Direction::N8nToMake => "n8nToMake",
            Direction::MakeToN8n => "makeToN8n",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source(), self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_names() {
        assert_eq!("n8n".parse::<Platform>().unwrap(), Platform::N8n);
        assert_eq!(" Make ".parse::<Platform>().unwrap(), Platform::Make);
        assert_eq!("integromat".parse::<Platform>().unwrap(), Platform::Make);
        assert!("zapier".parse::<Platform>().is_err());
    }

    #[test]
    fn direction_between_platforms() {
        assert_eq!(
            Direction::between(Platform::N8n, Platform::Make),
            Some(Direction::N8nToMake)
        );
        assert_eq!(Direction::between(Platform::Make, Platform::Make), None);
        assert_eq!(Direction::MakeToN8n.target(), Platform::N8n);
        assert_eq!(Direction::N8nToMake.reverse(), Direction::MakeToN8n);
    }
}
