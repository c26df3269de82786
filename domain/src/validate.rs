//! Input validation applied before anything reaches a store.
//! Keep logic minimal and deterministic.

use std::collections::HashSet;

use crate::{Address, CoreError, NewChat, NewCustomer, NewOrder, NewPost, NewUser, RecordId};

pub const MAX_CHAT_MESSAGE_CHARS: usize = 50;
pub const MAX_TEXT_CHARS: usize = 100;
pub const MAX_POST_CHARS: usize = 2000;

/// Required text field: non-blank and at most `max` characters.
pub fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid(field, "required"));
    }
    if value.chars().count() > max {
        return Err(CoreError::invalid(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), CoreError> {
    if !price.is_finite() {
        return Err(CoreError::invalid("price", "must be a finite number"));
    }
    if price < 0.0 {
        return Err(CoreError::invalid("price", "must not be negative"));
    }
    Ok(())
}

pub fn validate_chat_message(message: &str) -> Result<(), CoreError> {
    validate_text("message", message, MAX_CHAT_MESSAGE_CHARS)
}

/// Reject a reference list that names the same record twice.
pub fn validate_distinct_refs(ids: &[RecordId]) -> Result<(), CoreError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(CoreError::DuplicateReference(id.clone()));
        }
    }
    Ok(())
}

pub fn validate_new_order(input: &NewOrder) -> Result<(), CoreError> {
    validate_text("item", &input.item, MAX_TEXT_CHARS)?;
    validate_price(input.price)
}

pub fn validate_new_customer(input: &NewCustomer) -> Result<(), CoreError> {
    validate_text("name", &input.name, MAX_TEXT_CHARS)?;
    validate_distinct_refs(&input.orders)
}

pub fn validate_new_chat(input: &NewChat) -> Result<(), CoreError> {
    validate_text("from", &input.from, MAX_TEXT_CHARS)?;
    validate_text("to", &input.to, MAX_TEXT_CHARS)?;
    validate_chat_message(&input.message)
}

pub fn validate_address(address: &Address) -> Result<(), CoreError> {
    validate_text("location", &address.location, MAX_TEXT_CHARS)?;
    validate_text("city", &address.city, MAX_TEXT_CHARS)
}

pub fn validate_new_user(input: &NewUser) -> Result<(), CoreError> {
    validate_text("username", &input.username, MAX_TEXT_CHARS)?;
    input.addresses.iter().try_for_each(validate_address)
}

pub fn validate_new_post(input: &NewPost) -> Result<(), CoreError> {
    validate_text("content", &input.content, MAX_POST_CHARS)
}
