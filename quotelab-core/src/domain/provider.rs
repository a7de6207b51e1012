//! The two supported quote providers and their naming conventions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External data source an artifact came from.
///
/// Serializes to the label stored in the `provider` field of the metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "alpha vantage")]
    AlphaVantage,
    #[serde(rename = "yahoo finance")]
    YahooFinance,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::AlphaVantage, Provider::YahooFinance];

    /// Metadata label: `"alpha vantage"` or `"yahoo finance"`.
    pub fn label(self) -> &'static str {
        match self {
            Provider::AlphaVantage => "alpha vantage",
            Provider::YahooFinance => "yahoo finance",
        }
    }

    /// Two-letter service code written to the result log.
    pub fn service_code(self) -> &'static str {
        match self {
            Provider::AlphaVantage => "AV",
            Provider::YahooFinance => "YF",
        }
    }

    /// Directory under the data root holding this provider's runs.
    pub fn dir_name(self) -> &'static str {
        match self {
            Provider::AlphaVantage => "AlphaVantage",
            Provider::YahooFinance => "YahooFinance",
        }
    }

    /// Whether the provider reports timestamps in exchange-local wall-clock time.
    ///
    /// Alpha Vantage does; Yahoo returns epoch seconds, which are UTC already.
    pub fn reports_local_time(self) -> bool {
        matches!(self, Provider::AlphaVantage)
    }

    pub fn from_service_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.service_code() == code)
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.dir_name() == name)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Provider {
    type Err = String;

    /// Accepts service codes, directory names, labels and the one-letter
    /// shorthands `a`/`y`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        match key.as_str() {
            "a" | "av" | "alphavantage" | "alpha vantage" | "alpha_vantage" => {
                Ok(Provider::AlphaVantage)
            }
            "y" | "yf" | "yahoo" | "yahoofinance" | "yahoo finance" | "yahoo_finance" => {
                Ok(Provider::YahooFinance)
            }
            _ => Err(format!(
                "unknown provider '{s}' (expected one of: av, yf, alphavantage, yahoo)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_metadata_label() {
        let json = serde_json::to_string(&Provider::AlphaVantage).unwrap();
        assert_eq!(json, "\"alpha vantage\"");
        let back: Provider = serde_json::from_str("\"yahoo finance\"").unwrap();
        assert_eq!(back, Provider::YahooFinance);
    }

    #[test]
    fn parses_shorthands() {
        assert_eq!("A".parse::<Provider>().unwrap(), Provider::AlphaVantage);
        assert_eq!("yf".parse::<Provider>().unwrap(), Provider::YahooFinance);
        assert_eq!("Yahoo".parse::<Provider>().unwrap(), Provider::YahooFinance);
        assert!("bloomberg".parse::<Provider>().is_err());
    }

    #[test]
    fn lookup_by_code_and_dir() {
        assert_eq!(Provider::from_service_code("AV"), Some(Provider::AlphaVantage));
        assert_eq!(Provider::from_dir_name("YahooFinance"), Some(Provider::YahooFinance));
        assert_eq!(Provider::from_dir_name("Other"), None);
    }

    #[test]
    fn only_alpha_vantage_needs_zone_conversion() {
        assert!(Provider::AlphaVantage.reports_local_time());
        assert!(!Provider::YahooFinance.reports_local_time());
    }
}
