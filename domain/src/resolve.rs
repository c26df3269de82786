//! Reference resolution ("populate").
//!
//! Replaces identifiers stored in a parent record with the full child records
//! they point at. Resolution runs after the parent read has completed and makes
//! no transactional promise: a child deleted in between simply shows up as
//! missing.
//!
//! A reference that resolves to nothing is dropped from the populated list and
//! reported in `missing`, so a populated list is never longer than the stored
//! reference list. Only store failures abort resolution.

use crate::{CoreError, Customer, Order, OrderRepository, Post, RecordId, User, UserRepository};

/// Outcome of resolving a list of references.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved<T> {
    /// Records found, in the order their ids were stored.
    pub records: Vec<T>,
    /// Ids that did not resolve to a record.
    pub missing: Vec<RecordId>,
}

/// Resolve each id with `fetch`, preserving order.
///
/// `Ok(None)` and `Err(CoreError::NotFound)` count as a missing reference and
/// resolution continues; any other error aborts and is returned.
pub fn resolve_many<T, F>(ids: &[RecordId], mut fetch: F) -> Result<Resolved<T>, CoreError>
where
    F: FnMut(&RecordId) -> Result<Option<T>, CoreError>,
{
    let mut records = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();
    for id in ids {
        match fetch(id) {
            Ok(Some(record)) => records.push(record),
            Ok(None) | Err(CoreError::NotFound) => missing.push(id.clone()),
            Err(e) => return Err(e),
        }
    }
    Ok(Resolved { records, missing })
}

/// Resolve a single reference with the same missing/abort rules as
/// [`resolve_many`].
pub fn resolve_one<T, F>(id: &RecordId, fetch: F) -> Result<Option<T>, CoreError>
where
    F: FnOnce(&RecordId) -> Result<Option<T>, CoreError>,
{
    match fetch(id) {
        Ok(found) => Ok(found),
        Err(CoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// A customer with its order references replaced by the orders themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulatedCustomer {
    pub id: RecordId,
    pub name: String,
    pub orders: Vec<Order>,
    /// Stored references that no longer point at an order.
    pub missing_orders: Vec<RecordId>,
}

impl PopulatedCustomer {
    pub fn populate<R>(customer: Customer, orders: &R) -> Result<Self, CoreError>
    where
        R: OrderRepository + ?Sized,
    {
        let resolved = resolve_many(&customer.orders, |id| orders.get_order(id))?;
        Ok(Self {
            id: customer.id,
            name: customer.name,
            orders: resolved.records,
            missing_orders: resolved.missing,
        })
    }
}

/// A post with its author resolved. `author` is `None` when the author record
/// no longer exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopulatedPost {
    pub id: RecordId,
    pub content: String,
    pub likes: u32,
    pub author_id: RecordId,
    pub author: Option<User>,
}

impl PopulatedPost {
    pub fn populate<R>(post: Post, users: &R) -> Result<Self, CoreError>
    where
        R: UserRepository + ?Sized,
    {
        let author = resolve_one(&post.author, |id| users.get_user(id))?;
        Ok(Self {
            id: post.id,
            content: post.content,
            likes: post.likes,
            author_id: post.author,
            author,
        })
    }
}
