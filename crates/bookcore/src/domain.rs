//! Domain vocabulary: sales regions, book editions, payment status and money.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of the region button callback data
pub const COUNTRY_CALLBACK_PREFIX: &str = "country_";

/// Sales region picked by the buyer. Selects the price, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    ES,
    CA,
    US,
    TR,
    CIS,
    AS,
}

impl Country {
    /// Fallback region for missing or unknown codes
    pub const DEFAULT: Country = Country::ES;

    /// Keyboard order
    pub const ALL: [Country; 6] = [
        Country::ES,
        Country::CA,
        Country::US,
        Country::TR,
        Country::CIS,
        Country::AS,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Country::ES => "ES",
            Country::CA => "CA",
            Country::US => "US",
            Country::TR => "TR",
            Country::CIS => "CIS",
            Country::AS => "AS",
        }
    }

    /// Exact, case-sensitive match on the region code.
    pub fn from_code(code: &str) -> Option<Country> {
        Country::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Like `from_code` but never fails.
    pub fn from_code_or_default(code: Option<&str>) -> Country {
        code.and_then(Country::from_code).unwrap_or(Country::DEFAULT)
    }

    /// Parses `country_<CODE>` button data.
    pub fn from_callback(data: &str) -> Option<Country> {
        data.strip_prefix(COUNTRY_CALLBACK_PREFIX).and_then(Country::from_code)
    }

    pub fn callback_data(self) -> String {
        format!("{}{}", COUNTRY_CALLBACK_PREFIX, self.code())
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Country::ES => "🇪🇺 EU",
            Country::CA => "🇨🇦 Canada",
            Country::US => "🇺🇸 USA",
            Country::TR => "🇹🇷 Türkiye",
            Country::CIS => "🌍 CIS",
            Country::AS => "🌏 Asia",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Language edition of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookLanguage {
    DE,
    EN,
    ES,
    RU,
    TR,
}

impl BookLanguage {
    /// Keyboard order
    pub const ALL: [BookLanguage; 5] = [
        BookLanguage::DE,
        BookLanguage::EN,
        BookLanguage::ES,
        BookLanguage::RU,
        BookLanguage::TR,
    ];

    pub fn code(self) -> &'static str {
        match self {
            BookLanguage::DE => "DE",
            BookLanguage::EN => "EN",
            BookLanguage::ES => "ES",
            BookLanguage::RU => "RU",
            BookLanguage::TR => "TR",
        }
    }

    /// Accepts button data or typed text: trimmed, ASCII case-insensitive.
    pub fn from_code(input: &str) -> Option<BookLanguage> {
        let trimmed = input.trim();
        BookLanguage::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(trimmed))
    }

    pub fn button_label(self) -> &'static str {
        match self {
            BookLanguage::DE => "🇩🇪 German",
            BookLanguage::EN => "🇬🇧 English",
            BookLanguage::ES => "🇪🇸 Spanish",
            BookLanguage::RU => "🇷🇺 Russian",
            BookLanguage::TR => "🇹🇷 Turkish",
        }
    }

    /// `<dir>/<title>:<LANG>.pdf`
    pub fn book_path(self, dir: &Path, title: &str) -> PathBuf {
        dir.join(format!("{}:{}.pdf", title, self.code()))
    }
}

impl fmt::Display for BookLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lifecycle of a checkout session as recorded in the payments table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<PaymentStatus> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currencies Stripe treats as having no minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv", "xaf", "xof", "xpf",
];

/// Amount in the currency's smallest unit, as Stripe reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    /// Lowercase ISO code, empty when unknown
    pub currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_minor,
            currency: currency.into().to_ascii_lowercase(),
        }
    }

    pub fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.currency.as_str())
    }

    /// Decimal rendering in major units, e.g. 1999 usd -> "19.99".
    pub fn major_units(&self) -> String {
        if self.is_zero_decimal() {
            return self.amount_minor.to_string();
        }
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.currency.is_empty() {
            f.write_str(&self.major_units())
        } else {
            write!(f, "{} {}", self.major_units(), self.currency.to_ascii_uppercase())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_country_codes_and_callbacks() {
        for country in Country::ALL {
            assert_eq!(Country::from_code(country.code()), Some(country));
            assert_eq!(Country::from_callback(&country.callback_data()), Some(country));
        }
        assert_eq!(Country::from_callback("country_us"), None);
        assert_eq!(Country::from_callback("US"), None);
        assert_eq!(Country::from_callback("country_FR"), None);
    }

    #[test]
    fn test_country_default_fallback() {
        assert_eq!(Country::from_code_or_default(None), Country::ES);
        assert_eq!(Country::from_code_or_default(Some("XX")), Country::ES);
        assert_eq!(Country::from_code_or_default(Some("TR")), Country::TR);
    }

    #[test]
    fn test_language_parsing_is_lenient() {
        assert_eq!(BookLanguage::from_code("EN"), Some(BookLanguage::EN));
        assert_eq!(BookLanguage::from_code(" ru \n"), Some(BookLanguage::RU));
        assert_eq!(BookLanguage::from_code("Tr"), Some(BookLanguage::TR));
        assert_eq!(BookLanguage::from_code("FR"), None);
        assert_eq!(BookLanguage::from_code("ENG"), None);
    }

    #[test]
    fn test_book_path() {
        let path = BookLanguage::EN.book_path(Path::new("pfdSender"), "Trade-Plus.Online");
        assert_eq!(path, Path::new("pfdSender").join("Trade-Plus.Online:EN.pdf"));
        assert!(path.to_string_lossy().ends_with("EN.pdf"));
    }

    #[test]
    fn test_payment_status_round_trip() {
        assert_eq!(PaymentStatus::parse("pending"), Some(PaymentStatus::Pending));
        assert_eq!(PaymentStatus::parse(PaymentStatus::Completed.as_str()), Some(PaymentStatus::Completed));
        assert_eq!(PaymentStatus::parse("paid"), None);
    }

    #[test]
    fn test_money_major_units() {
        assert_eq!(Money::new(1999, "USD").major_units(), "19.99");
        assert_eq!(Money::new(5, "eur").major_units(), "0.05");
        assert_eq!(Money::new(-250, "eur").major_units(), "-2.50");
        assert_eq!(Money::new(1500, "jpy").major_units(), "1500");
        assert_eq!(Money::new(1999, "usd").to_string(), "19.99 USD");
        assert_eq!(Money::new(100, "").to_string(), "1.00");
    }
}
