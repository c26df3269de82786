use std::sync::{Mutex, MutexGuard};

use crate::{
    Address, ChatMessage, ChatRepository, CoreError, Customer, CustomerRepository, Order,
    OrderRepository, Post, PostRepository, RecordId, SequenceRepository, User, UserRepository,
};

/// Simple in-memory document store for tests and demos. Collections are kept
/// in insertion order behind a single mutex.
pub struct InMemoryStore {
    inner: Mutex<Collections>,
}

#[derive(Default)]
struct Collections {
    sequence: u64,
    orders: Vec<Order>,
    customers: Vec<Customer>,
    chats: Vec<ChatMessage>,
    users: Vec<User>,
    posts: Vec<Post>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Collections::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn position_of<T>(items: &[T], id: &RecordId, key: impl Fn(&T) -> &RecordId) -> Option<usize> {
    items.iter().position(|item| key(item) == id)
}

impl SequenceRepository for InMemoryStore {
    fn next_sequence(&self) -> Result<u64, CoreError> {
        let mut c = self.lock()?;
        c.sequence = c.sequence.saturating_add(1);
        Ok(c.sequence)
    }
}

impl OrderRepository for InMemoryStore {
    fn insert_order(&self, order: Order) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        if position_of(&c.orders, &order.id, |o| &o.id).is_some() {
            return Err(CoreError::AlreadyExists);
        }
        c.orders.push(order);
        Ok(())
    }

    fn get_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        let c = self.lock()?;
        Ok(c.orders.iter().find(|o| &o.id == id).cloned())
    }

    fn list_orders(&self) -> Result<Vec<Order>, CoreError> {
        Ok(self.lock()?.orders.clone())
    }

    fn remove_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        let mut c = self.lock()?;
        Ok(position_of(&c.orders, id, |o| &o.id).map(|idx| c.orders.remove(idx)))
    }
}

impl CustomerRepository for InMemoryStore {
    fn insert_customer(&self, customer: Customer) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        if position_of(&c.customers, &customer.id, |x| &x.id).is_some() {
            return Err(CoreError::AlreadyExists);
        }
        c.customers.push(customer);
        Ok(())
    }

    fn get_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        let c = self.lock()?;
        Ok(c.customers.iter().find(|x| &x.id == id).cloned())
    }

    fn list_customers(&self) -> Result<Vec<Customer>, CoreError> {
        Ok(self.lock()?.customers.clone())
    }

    fn push_order_ref(
        &self,
        customer_id: &RecordId,
        order_id: &RecordId,
    ) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        match c.customers.iter_mut().find(|x| &x.id == customer_id) {
            Some(customer) => {
                customer.orders.push(order_id.clone());
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    fn remove_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        let mut c = self.lock()?;
        Ok(position_of(&c.customers, id, |x| &x.id).map(|idx| c.customers.remove(idx)))
    }
}

impl ChatRepository for InMemoryStore {
    fn insert_chat(&self, chat: ChatMessage) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        if position_of(&c.chats, &chat.id, |x| &x.id).is_some() {
            return Err(CoreError::AlreadyExists);
        }
        c.chats.push(chat);
        Ok(())
    }

    fn get_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        let c = self.lock()?;
        Ok(c.chats.iter().find(|x| &x.id == id).cloned())
    }

    fn list_chats(&self) -> Result<Vec<ChatMessage>, CoreError> {
        Ok(self.lock()?.chats.clone())
    }

    fn set_chat_message(
        &self,
        id: &RecordId,
        message: &str,
    ) -> Result<Option<ChatMessage>, CoreError> {
        let mut c = self.lock()?;
        Ok(c.chats.iter_mut().find(|x| &x.id == id).map(|chat| {
            chat.message = message.to_string();
            chat.clone()
        }))
    }

    fn remove_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        let mut c = self.lock()?;
        Ok(position_of(&c.chats, id, |x| &x.id).map(|idx| c.chats.remove(idx)))
    }
}

impl UserRepository for InMemoryStore {
    fn insert_user(&self, user: User) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        if position_of(&c.users, &user.id, |x| &x.id).is_some() {
            return Err(CoreError::AlreadyExists);
        }
        c.users.push(user);
        Ok(())
    }

    fn get_user(&self, id: &RecordId) -> Result<Option<User>, CoreError> {
        let c = self.lock()?;
        Ok(c.users.iter().find(|x| &x.id == id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, CoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn push_address(&self, user_id: &RecordId, address: Address) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        match c.users.iter_mut().find(|x| &x.id == user_id) {
            Some(user) => {
                user.addresses.push(address);
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }
}

impl PostRepository for InMemoryStore {
    fn insert_post(&self, post: Post) -> Result<(), CoreError> {
        let mut c = self.lock()?;
        if position_of(&c.posts, &post.id, |x| &x.id).is_some() {
            return Err(CoreError::AlreadyExists);
        }
        c.posts.push(post);
        Ok(())
    }

    fn get_post(&self, id: &RecordId) -> Result<Option<Post>, CoreError> {
        let c = self.lock()?;
        Ok(c.posts.iter().find(|x| &x.id == id).cloned())
    }

    fn list_posts_by_author(&self, author: &RecordId) -> Result<Vec<Post>, CoreError> {
        let c = self.lock()?;
        Ok(c.posts
            .iter()
            .filter(|p| &p.author == author)
            .cloned()
            .collect())
    }
}
