use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern is valid"));

static TRANSACTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{1,64}$").expect("transaction pattern is valid"));

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    if !ADDRESS_PATTERN.is_match(address) {
        return Err(ValidationError::new("invalid_address"));
    }
    Ok(())
}

pub fn validate_transaction_hash(hash: &str) -> Result<(), ValidationError> {
    if !TRANSACTION_PATTERN.is_match(hash) {
        return Err(ValidationError::new("invalid_transaction_hash"));
    }
    Ok(())
}
