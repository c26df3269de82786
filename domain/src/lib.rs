//! Domain library for the relationship vault.
//!
//! Holds the record types, ports (traits), and error definitions for three
//! relationship styles over a document store: referencing (customers hold
//! order ids), embedding (users hold their addresses inline) and parent
//! referencing (posts hold their author's id). Chat messages are independent
//! records with no relationships. Keep adapters and IO concerns out of this
//! crate; `serde` is only here so identifiers cross the HTTP boundary intact.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Generated unique identifier of a stored record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub const MAX_LEN: usize = 64;

    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidId("empty".into()));
        }
        if val.len() > Self::MAX_LEN {
            return Err(CoreError::InvalidId("too long".into()));
        }
        if !val.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidId("invalid characters".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A purchased item. Created on its own and never modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: RecordId,
    pub item: String,
    pub price: f64,
}

/// Input for creating an order.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub item: String,
    pub price: f64,
}

/// A customer referencing its orders by id (one-to-many, referencing).
///
/// `orders` keeps insertion order. The store does not deduplicate it; the
/// service rejects duplicate references before they are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    pub orders: Vec<RecordId>,
}

/// Input for creating a customer, optionally with initial order references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub orders: Vec<RecordId>,
}

/// A chat message between two people. No relationships.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: RecordId,
    pub from: String,
    pub to: String,
    pub message: String,
    pub date: SystemTime,
}

/// Input for creating a chat message; `date` is stamped by the service clock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewChat {
    pub from: String,
    pub to: String,
    pub message: String,
}

/// Address stored inline inside its user (one-to-few, embedding).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub location: String,
    pub city: String,
}

/// A user with embedded addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub addresses: Vec<Address>,
}

/// Input for creating a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub addresses: Vec<Address>,
}

/// A post pointing back at its author (one-to-squillions, parent referencing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: RecordId,
    pub content: String,
    pub likes: u32,
    pub author: RecordId,
}

/// Input for creating a post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPost {
    pub content: String,
    pub likes: u32,
    pub author: RecordId,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdClock;

impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Id generator interface; deterministic by input sequence in some strategies.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, seq: u64) -> RecordId;
}

/// Store-backed monotonically increasing sequence used to mint record ids.
pub trait SequenceRepository: Send + Sync {
    fn next_sequence(&self) -> Result<u64, CoreError>;
}

/// Repository port for orders.
pub trait OrderRepository: Send + Sync {
    fn insert_order(&self, order: Order) -> Result<(), CoreError>;
    fn get_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError>;
    /// All orders in insertion order.
    fn list_orders(&self) -> Result<Vec<Order>, CoreError>;
    /// Remove an order and return it. References to it are left untouched.
    fn remove_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError>;
}

/// Repository port for customers.
pub trait CustomerRepository: Send + Sync {
    fn insert_customer(&self, customer: Customer) -> Result<(), CoreError>;
    fn get_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError>;
    fn list_customers(&self) -> Result<Vec<Customer>, CoreError>;
    /// Append an order reference to the end of the customer's list.
    fn push_order_ref(&self, customer_id: &RecordId, order_id: &RecordId)
        -> Result<(), CoreError>;
    fn remove_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError>;
}

/// Repository port for chat messages.
pub trait ChatRepository: Send + Sync {
    fn insert_chat(&self, chat: ChatMessage) -> Result<(), CoreError>;
    fn get_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError>;
    fn list_chats(&self) -> Result<Vec<ChatMessage>, CoreError>;
    /// Replace the message text and return the updated record.
    fn set_chat_message(&self, id: &RecordId, message: &str)
        -> Result<Option<ChatMessage>, CoreError>;
    fn remove_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError>;
}

/// Repository port for users and their embedded addresses.
pub trait UserRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<(), CoreError>;
    fn get_user(&self, id: &RecordId) -> Result<Option<User>, CoreError>;
    fn list_users(&self) -> Result<Vec<User>, CoreError>;
    fn push_address(&self, user_id: &RecordId, address: Address) -> Result<(), CoreError>;
}

/// Repository port for posts.
pub trait PostRepository: Send + Sync {
    fn insert_post(&self, post: Post) -> Result<(), CoreError>;
    fn get_post(&self, id: &RecordId) -> Result<Option<Post>, CoreError>;
    fn list_posts_by_author(&self, author: &RecordId) -> Result<Vec<Post>, CoreError>;
}

/// Every port a backing store provides. Implemented automatically.
pub trait DocumentStore:
    SequenceRepository
    + OrderRepository
    + CustomerRepository
    + ChatRepository
    + UserRepository
    + PostRepository
{
}

impl<T> DocumentStore for T where
    T: SequenceRepository
        + OrderRepository
        + CustomerRepository
        + ChatRepository
        + UserRepository
        + PostRepository
{
}

/// Core domain errors (no external error crates to keep deps minimal).
#[derive(Debug)]
pub enum CoreError {
    InvalidId(String),
    InvalidField { field: &'static str, reason: String },
    DuplicateReference(RecordId),
    UnknownReference(RecordId),
    AlreadyExists,
    NotFound,
    Repository(String),
}

impl CoreError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CoreError::Repository(_))
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidId(msg) => write!(f, "invalid id: {}", msg),
            CoreError::InvalidField { field, reason } => write!(f, "invalid {}: {}", field, reason),
            CoreError::DuplicateReference(id) => write!(f, "duplicate reference: {}", id),
            CoreError::UnknownReference(id) => write!(f, "unknown reference: {}", id),
            CoreError::AlreadyExists => write!(f, "resource already exists"),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - relationship vault", pkg, ver)
}

pub mod adapters;
pub mod base62;
pub mod id;
pub mod resolve;
pub mod seed;
pub mod service;
pub mod validate;
