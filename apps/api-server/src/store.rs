//! Store selection: in-memory or SQLite (feature-gated) behind one type.

use domain::adapters::memory_store::InMemoryStore;
use domain::{
    Address, ChatMessage, ChatRepository, CoreError, Customer, CustomerRepository,
    DocumentStore, Order, OrderRepository, Post, PostRepository, RecordId, SequenceRepository,
    User, UserRepository,
};

enum StoreKind {
    Memory(InMemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteStore),
}

/// Process-scoped store handle, built once at startup.
pub struct AnyStore {
    kind: StoreKind,
}

impl AnyStore {
    pub fn memory() -> Self {
        Self {
            kind: StoreKind::Memory(InMemoryStore::new()),
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: &std::path::Path) -> Result<Self, CoreError> {
        Ok(Self {
            kind: StoreKind::Sqlite(sqlite_adapter::SqliteStore::open(path)?),
        })
    }

    pub fn backend(&self) -> &'static str {
        match &self.kind {
            StoreKind::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite(_) => "sqlite",
        }
    }

    fn inner(&self) -> &dyn DocumentStore {
        match &self.kind {
            StoreKind::Memory(s) => s,
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite(s) => s,
        }
    }
}

impl SequenceRepository for AnyStore {
    fn next_sequence(&self) -> Result<u64, CoreError> {
        self.inner().next_sequence()
    }
}

impl OrderRepository for AnyStore {
    fn insert_order(&self, order: Order) -> Result<(), CoreError> {
        self.inner().insert_order(order)
    }

    fn get_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        self.inner().get_order(id)
    }

    fn list_orders(&self) -> Result<Vec<Order>, CoreError> {
        self.inner().list_orders()
    }

    fn remove_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        self.inner().remove_order(id)
    }
}

impl CustomerRepository for AnyStore {
    fn insert_customer(&self, customer: Customer) -> Result<(), CoreError> {
        self.inner().insert_customer(customer)
    }

    fn get_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        self.inner().get_customer(id)
    }

    fn list_customers(&self) -> Result<Vec<Customer>, CoreError> {
        self.inner().list_customers()
    }

    fn push_order_ref(
        &self,
        customer_id: &RecordId,
        order_id: &RecordId,
    ) -> Result<(), CoreError> {
        self.inner().push_order_ref(customer_id, order_id)
    }

    fn remove_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        self.inner().remove_customer(id)
    }
}

impl ChatRepository for AnyStore {
    fn insert_chat(&self, chat: ChatMessage) -> Result<(), CoreError> {
        self.inner().insert_chat(chat)
    }

    fn get_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        self.inner().get_chat(id)
    }

    fn list_chats(&self) -> Result<Vec<ChatMessage>, CoreError> {
        self.inner().list_chats()
    }

    fn set_chat_message(
        &self,
        id: &RecordId,
        message: &str,
    ) -> Result<Option<ChatMessage>, CoreError> {
        self.inner().set_chat_message(id, message)
    }

    fn remove_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        self.inner().remove_chat(id)
    }
}

impl UserRepository for AnyStore {
    fn insert_user(&self, user: User) -> Result<(), CoreError> {
        self.inner().insert_user(user)
    }

    fn get_user(&self, id: &RecordId) -> Result<Option<User>, CoreError> {
        self.inner().get_user(id)
    }

    fn list_users(&self) -> Result<Vec<User>, CoreError> {
        self.inner().list_users()
    }

    fn push_address(&self, user_id: &RecordId, address: Address) -> Result<(), CoreError> {
        self.inner().push_address(user_id, address)
    }
}

impl PostRepository for AnyStore {
    fn insert_post(&self, post: Post) -> Result<(), CoreError> {
        self.inner().insert_post(post)
    }

    fn get_post(&self, id: &RecordId) -> Result<Option<Post>, CoreError> {
        self.inner().get_post(id)
    }

    fn list_posts_by_author(&self, author: &RecordId) -> Result<Vec<Post>, CoreError> {
        self.inner().list_posts_by_author(author)
    }
}
