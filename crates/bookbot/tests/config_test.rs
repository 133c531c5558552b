//! Environment-driven configuration. These tests mutate process env, so they run serially.

use bookcore::core::config;
use bookcore::payments::PriceTable;
use bookcore::{AppError, Country};
use serial_test::serial;

const REQUIRED: [&str; 6] = [
    "BOT_TOKEN",
    "TELOXIDE_TOKEN",
    "TOKEN",
    "STRIPE_SECRET_KEY",
    "STRIPE_WEBHOOK_SECRET",
    "STRIPE_PRICE_ID",
];

fn clear_required() {
    for name in REQUIRED {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_validate_required_names_missing_variables() {
    clear_required();
    std::env::set_var("STRIPE_SECRET_KEY", "sk_test_1");

    match config::validate_required() {
        Err(AppError::Config(message)) => {
            assert!(message.contains("BOT_TOKEN"));
            assert!(message.contains("STRIPE_WEBHOOK_SECRET"));
            assert!(message.contains("STRIPE_PRICE_ID"));
            assert!(!message.contains("STRIPE_SECRET_KEY"));
        }
        other => panic!("expected a configuration error, got {:?}", other),
    }

    clear_required();
}

#[test]
#[serial]
fn test_validate_required_accepts_complete_env() {
    clear_required();
    std::env::set_var("TOKEN", "123:abc");
    std::env::set_var("STRIPE_SECRET_KEY", "sk_test_1");
    std::env::set_var("STRIPE_WEBHOOK_SECRET", "whsec_1");
    std::env::set_var("STRIPE_PRICE_ID", "price_test_1");

    assert!(config::validate_required().is_ok());

    clear_required();
}

#[test]
#[serial]
fn test_region_price_override_from_env() {
    std::env::set_var("STRIPE_PRICE_TR", "price_turkey");
    std::env::remove_var("STRIPE_PRICE_US");

    let table = PriceTable::from_env();
    assert_eq!(table.price_for(Country::TR), "price_turkey");
    assert_eq!(table.price_for(Country::US), config::stripe::DEFAULT_PRICE_ID.as_str());

    std::env::remove_var("STRIPE_PRICE_TR");
}
