//! Italian power exchange (GME) market data from mercatoelettrico.org.
//!
//! The site serves one XML document per market, data type and day, but only
//! after its terms of use have been accepted. Each request posts the accepted
//! terms form with the document's path as `ReturnUrl`; the site then
//! redirects to the document, carrying the acceptance in a session cookie.

use super::provider::DataError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.mercatoelettrico.org/It/Tools/Accessodati.aspx";

/// Data types published for the day-ahead market.
pub const MGP_TYPES: [&str; 10] = [
    "StimeFabbisogno",
    "LimitiTransito",
    "PrezziConvenzionali",
    "Quantita",
    "Liquidita",
    "Transiti",
    "Fabbisogno",
    "OfferteIntegrativeGrtn",
    "Prezzi",
    "MarketCoupling",
];

/// Data types published for each intraday session.
pub const MI_TYPES: [&str; 4] = ["LimitiTransito", "PrezziConvenzionali", "Prezzi", "Quantita"];

/// Number of intraday sessions (`MI1` to `MI7`).
pub const MI_SESSIONS: u8 = 7;

// ASP.NET form state of the terms page.
const VIEWSTATE: &str = "/wEPDwULLTIwNTEyNDQzNzQPZBYCZg9kFgICAw9kFgJmD2QWBAIMD2QWAmYPZBYCZg9kFgICCQ8PZBYCHgpvbmtleXByZXNzBRxyZXR1cm4gaW52aWFQV0QodGhpcyxldmVudCk7ZAIVD2QWAgIBDw8WAh4NT25DbGllbnRDbGljawUmamF2YXNjcmlwdDp3aW5kb3cub3BlbignP3N0YW1wYT10cnVlJylkZBgBBR5fX0NvbnRyb2xzUmVxdWlyZVBvc3RCYWNrS2V5X18WBQUMY3RsMDAkSW1hZ2UxBRJjdGwwMCRJbWFnZUJ1dHRvbjEFIGN0bDAwJENvbnRlbnRQbGFjZUhvbGRlcjEkc3RhbXBhBSRjdGwwMCRDb250ZW50UGxhY2VIb2xkZXIxJENCQWNjZXR0bzEFJGN0bDAwJENvbnRlbnRQbGFjZUhvbGRlcjEkQ0JBY2NldHRvMvV5e94ExnpHUcybAr1bPdOOHxYDHpQG7fgAyUlbfpUy";
const EVENT_VALIDATION: &str = "/wEdABN5QfIZ0Z09c70NXWGRJiGpcS/s8I39AyxLz4tn+AkBiEW+okpiqwYG+B4aTa9o+s43drX32rKpFiwqoHxZnWEOD4zZrxX92uOlyIx1SyGTQmV8haT0EfVomfKCKov4HgnZl/Xwcz7QqxVnz+OmFVuWzNBM98trssXld5dD73vgQX4H/0z/058uP3NmytG8PXozrkfQ7SmiPGgdsZPdEEV8g/gu4+zhSeI0ttI2ADLh/wU7Nz/6FKjnm2sSszw4FMr8VEDvc+zuMc1oKpjHdCosjDu35o5CUn6umW4JNpE1p4raaQaFnXKaLuO1sKRm4e9ZUwtJIYRkZxZmb4HmgHR6ltkgVwReXnm+EHOYvXjKP0Sd1PBpsO2hEyKj10xH8juA+rwVNruExpEBEKBupGsoUlq8qqob2Hte6ABdfJHWar0vp/uG8tjo+1et9YAPjLg=";

/// A GME market: the day-ahead market or one intraday session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GmeMarket {
    /// Mercato del Giorno Prima.
    Mgp,
    /// Mercato Infragiornaliero session, 1 to 7.
    Mi(u8),
}

impl GmeMarket {
    /// The intraday session `number`, which must be 1 to 7.
    pub fn mi(number: u8) -> Result<Self, DataError> {
        if (1..=MI_SESSIONS).contains(&number) {
            Ok(GmeMarket::Mi(number))
        } else {
            Err(DataError::InvalidRequest(format!(
                "GME intraday session must be 1 to {MI_SESSIONS}, got {number}"
            )))
        }
    }

    /// Data types this market publishes.
    pub fn data_types(self) -> &'static [&'static str] {
        match self {
            GmeMarket::Mgp => &MGP_TYPES,
            GmeMarket::Mi(_) => &MI_TYPES,
        }
    }

    fn check_type(self, data_type: &str) -> Result<(), DataError> {
        if self.data_types().contains(&data_type) {
            return Ok(());
        }
        Err(DataError::InvalidRequest(format!(
            "{self} has no data type '{data_type}' (expected one of: {})",
            self.data_types().join(", ")
        )))
    }
}

impl fmt::Display for GmeMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GmeMarket::Mgp => f.write_str("MGP"),
            GmeMarket::Mi(n) => write!(f, "MI{n}"),
        }
    }
}

impl FromStr for GmeMarket {
    type Err = String;

    /// `MGP` or `MI1` to `MI7`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "MGP" {
            return Ok(GmeMarket::Mgp);
        }
        upper
            .strip_prefix("MI")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(|n| GmeMarket::mi(n).ok())
            .ok_or_else(|| format!("unknown GME market '{s}' (expected MGP or MI1 to MI{MI_SESSIONS})"))
    }
}

/// Terms-page URL that redirects to the document for `market`, `data_type`
/// and `day` once the terms are accepted.
pub fn document_url(base_url: &str, market: GmeMarket, data_type: &str, day: NaiveDate) -> String {
    let day = day.format("%Y%m%d");
    format!("{base_url}?ReturnUrl=/It/WebServerDataStore/{market}_{data_type}/{day}{market}{data_type}.xml")
}

/// Anything but 200 means the document does not exist for that day or type.
fn check_status(
    status: reqwest::StatusCode,
    market: GmeMarket,
    data_type: &str,
    day: NaiveDate,
) -> Result<(), DataError> {
    if status == reqwest::StatusCode::OK {
        return Ok(());
    }
    Err(DataError::NotServed {
        resource: format!("GME {market} {data_type} for {day}"),
        status: status.as_u16(),
    })
}

/// mercatoelettrico.org client. Returns the raw XML document.
pub struct GmeDownloader {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GmeDownloader {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Day-ahead market document.
    pub fn get_mgp(&self, data_type: &str, day: NaiveDate) -> Result<String, DataError> {
        self.get_data(GmeMarket::Mgp, data_type, day)
    }

    /// Intraday session `number` (1 to 7) document.
    pub fn get_mi(&self, number: u8, data_type: &str, day: NaiveDate) -> Result<String, DataError> {
        self.get_data(GmeMarket::mi(number)?, data_type, day)
    }

    pub fn get_data(
        &self,
        market: GmeMarket,
        data_type: &str,
        day: NaiveDate,
    ) -> Result<String, DataError> {
        market.check_type(data_type)?;
        let url = document_url(&self.base_url, market, data_type, day);
        tracing::debug!(%market, data_type, %day, "requesting GME document");

        let resp = self
            .client
            .post(&url)
            .form(&[
                ("__VIEWSTATE", VIEWSTATE),
                ("__EVENTVALIDATION", EVENT_VALIDATION),
                ("ctl00$ContentPlaceHolder1$CBAccetto1", "on"),
                ("ctl00$ContentPlaceHolder1$CBAccetto2", "on"),
                ("ctl00$ContentPlaceHolder1$Button1", "Accetto"),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        check_status(resp.status(), market, data_type, day)?;
        resp.text()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to read GME document: {e}")))
    }
}
