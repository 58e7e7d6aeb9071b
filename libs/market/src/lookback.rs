use std::str::FromStr;

use anyhow::{Error, bail};
use chrono::Duration;

/// Historical window bounding a bar request, parsed from strings like
/// `"30d"`, `"2w"`, `"3mo"` or `"1y"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    duration: Duration,
}

impl Lookback {
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl FromStr for Lookback {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count, unit) = s.split_at(split);

        let count: i64 = match count.parse() {
            Ok(n) if n > 0 => n,
            _ => bail!("invalid lookback duration {s:?}"),
        };

        let duration = match unit {
            "d" => Duration::days(count),
            "w" => Duration::weeks(count),
            "mo" => Duration::days(count * 30),
            "y" => Duration::days(count * 365),
            _ => bail!("invalid lookback duration {s:?}"),
        };

        Ok(Self { duration })
    }
}
