//! Resolution → bitrate tier table.
//!
//! The table is plain data so it can be swapped from configuration without
//! touching the planner. Tiers are matched by pixel count against an upper
//! bound; the first tier whose bound fits the frame wins.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// One row of the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BitrateTier {
    /// Largest frame (width × height) this tier covers; `None` matches everything.
    pub max_pixels: Option<u64>,
    /// Target video bitrate in kbps
    pub kbps: u32,
}

impl BitrateTier {
    pub fn up_to(width: u32, height: u32, kbps: u32) -> Self {
        Self {
            max_pixels: Some(u64::from(width) * u64::from(height)),
            kbps,
        }
    }

    pub fn catch_all(kbps: u32) -> Self {
        Self {
            max_pixels: None,
            kbps,
        }
    }

    fn covers(&self, pixels: u64) -> bool {
        self.max_pixels.map_or(true, |max| pixels <= max)
    }
}

/// Ordered set of bitrate tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BitrateTable {
    tiers: Vec<BitrateTier>,
}

impl Default for BitrateTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                BitrateTier::up_to(640, 480, 500),
                BitrateTier::up_to(1280, 720, 1000),
                BitrateTier::up_to(1920, 1080, 2000),
                BitrateTier::catch_all(4000),
            ],
        }
    }
}

impl BitrateTable {
    /// Build a table, sorting tiers by bound (catch-all last).
    pub fn new(mut tiers: Vec<BitrateTier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::invalid("bitrate tiers", "table is empty"));
        }
        if tiers.iter().any(|t| t.kbps == 0) {
            return Err(ConfigError::invalid("bitrate tiers", "kbps must be positive"));
        }
        tiers.sort_by_key(|t| t.max_pixels.unwrap_or(u64::MAX));
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[BitrateTier] {
        &self.tiers
    }

    /// Target bitrate for a frame size.
    ///
    /// Frames larger than every bounded tier fall into the last tier.
    pub fn lookup(&self, width: u32, height: u32) -> u32 {
        let pixels = u64::from(width) * u64::from(height);
        self.tiers
            .iter()
            .find(|t| t.covers(pixels))
            .or_else(|| self.tiers.last())
            .map(|t| t.kbps)
            .unwrap_or_default()
    }
}

/// Parses `640x480:500,1280x720:1000,*:4000`.
impl FromStr for BitrateTable {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (bound, kbps) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::invalid("bitrate tiers", format!("missing ':' in '{entry}'")))?;
            let kbps: u32 = kbps
                .trim()
                .trim_end_matches('k')
                .parse()
                .map_err(|_| ConfigError::invalid("bitrate tiers", format!("bad kbps in '{entry}'")))?;

            let bound = bound.trim();
            let tier = if bound == "*" {
                BitrateTier::catch_all(kbps)
            } else {
                let (w, h) = bound
                    .split_once(['x', 'X'])
                    .ok_or_else(|| ConfigError::invalid("bitrate tiers", format!("bad resolution in '{entry}'")))?;
                let w: u32 = w
                    .parse()
                    .map_err(|_| ConfigError::invalid("bitrate tiers", format!("bad width in '{entry}'")))?;
                let h: u32 = h
                    .parse()
                    .map_err(|_| ConfigError::invalid("bitrate tiers", format!("bad height in '{entry}'")))?;
                BitrateTier::up_to(w, h, kbps)
            };
            tiers.push(tier);
        }
        Self::new(tiers)
    }
}

impl fmt::Display for BitrateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .tiers
            .iter()
            .map(|t| match t.max_pixels {
                Some(px) => format!("<={px}px:{}k", t.kbps),
                None => format!("*:{}k", t.kbps),
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let table = BitrateTable::default();
        assert_eq!(table.lookup(640, 480), 500);
        assert_eq!(table.lookup(854, 480), 1000);
        assert_eq!(table.lookup(1280, 720), 1000);
        assert_eq!(table.lookup(1920, 1080), 2000);
        assert_eq!(table.lookup(1080, 1920), 2000);
        assert_eq!(table.lookup(3840, 2160), 4000);
    }

    #[test]
    fn test_parse_and_sort() {
        let table: BitrateTable = "*:3000, 1280x720:800k".parse().unwrap();
        assert_eq!(table.tiers()[0].kbps, 800);
        assert_eq!(table.lookup(1280, 720), 800);
        assert_eq!(table.lookup(1920, 1080), 3000);
    }

    #[test]
    fn test_without_catch_all_uses_last_tier() {
        let table: BitrateTable = "640x480:400,1280x720:900".parse().unwrap();
        assert_eq!(table.lookup(3840, 2160), 900);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<BitrateTable>().is_err());
        assert!("1280x720".parse::<BitrateTable>().is_err());
        assert!("1280:500".parse::<BitrateTable>().is_err());
        assert!("*:0".parse::<BitrateTable>().is_err());
    }
}
