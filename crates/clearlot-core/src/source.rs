use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in tags and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Finnhub,
    Fmp,
    Yahoo,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::Finnhub, Self::Fmp, Self::Yahoo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Finnhub => "finnhub",
            Self::Fmp => "fmp",
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "finnhub" => Ok(Self::Finnhub),
            "fmp" => Ok(Self::Fmp),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_sources() {
        assert_eq!(" Finnhub ".parse::<ProviderId>(), Ok(ProviderId::Finnhub));
        assert_eq!("fmp".parse::<ProviderId>(), Ok(ProviderId::Fmp));
    }

    #[test]
    fn rejects_unknown_sources() {
        let err = "bloomberg".parse::<ProviderId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSource { .. }));
    }
}
