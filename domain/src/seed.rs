//! Sample records used to initialise an empty store for local demos.

use crate::{NewChat, NewOrder};

pub const SAMPLE_CUSTOMER: &str = "Rahul Kumar";

pub fn sample_chats() -> Vec<NewChat> {
    [
        ("neha", "priya", "send me your exam sheets"),
        ("rohit", "mohit", "teach me JS callbacks"),
        ("amit", "sumit", "all the best!"),
        ("anita", "ramesh", "bring me some fruits"),
        ("tony", "peter", "love you 3000"),
    ]
    .into_iter()
    .map(|(from, to, message)| NewChat {
        from: from.to_string(),
        to: to.to_string(),
        message: message.to_string(),
    })
    .collect()
}

pub fn sample_orders() -> Vec<NewOrder> {
    [("samosa", 12.0), ("chips", 10.0), ("chocolate", 40.0)]
        .into_iter()
        .map(|(item, price)| NewOrder {
            item: item.to_string(),
            price,
        })
        .collect()
}
