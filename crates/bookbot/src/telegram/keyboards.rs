//! Inline keyboards shown during the purchase flow

use bookcore::{AppResult, BookLanguage, Country};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Six region buttons, two rows of three
    Regions,
    /// Five language buttons, three then two
    Languages,
    /// Single button opening the hosted checkout page
    CheckoutLink(String),
}

impl Keyboard {
    pub fn to_markup(&self) -> AppResult<InlineKeyboardMarkup> {
        let markup = match self {
            Keyboard::Regions => region_keyboard(),
            Keyboard::Languages => language_keyboard(),
            Keyboard::CheckoutLink(url) => checkout_keyboard(Url::parse(url)?),
        };
        Ok(markup)
    }
}

pub fn region_keyboard() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = Country::ALL
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|country| InlineKeyboardButton::callback(country.button_label(), country.callback_data()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn language_keyboard() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = BookLanguage::ALL
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|lang| InlineKeyboardButton::callback(lang.button_label(), lang.code()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn checkout_keyboard(url: Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url("🔒 Pay for the order", url)]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_rows(markup: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| match &button.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        other => panic!("unexpected button kind: {:?}", other),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_region_keyboard_layout() {
        let rows = callback_rows(&region_keyboard());
        assert_eq!(
            rows,
            vec![
                vec!["country_ES", "country_CA", "country_US"],
                vec!["country_TR", "country_CIS", "country_AS"],
            ]
        );
    }

    #[test]
    fn test_language_keyboard_layout() {
        let rows = callback_rows(&language_keyboard());
        assert_eq!(rows, vec![vec!["DE", "EN", "ES"], vec!["RU", "TR"]]);
    }

    #[test]
    fn test_checkout_link_requires_valid_url() {
        assert!(Keyboard::CheckoutLink("https://checkout.stripe.com/c/pay/cs_1".into())
            .to_markup()
            .is_ok());
        assert!(Keyboard::CheckoutLink("not a url".into()).to_markup().is_err());
    }
}
