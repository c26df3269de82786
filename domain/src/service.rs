use crate::resolve::{PopulatedCustomer, PopulatedPost};
use crate::seed;
use crate::validate::{
    validate_address, validate_chat_message, validate_new_chat, validate_new_customer,
    validate_new_order, validate_new_post, validate_new_user,
};
use crate::{
    Address, ChatMessage, Clock, CoreError, Customer, DocumentStore, IdGenerator, NewChat,
    NewCustomer, NewOrder, NewPost, NewUser, Order, Post, RecordId, User,
};

/// Application service over a document store.
///
/// Generic over the store, the id generator and the clock so the domain stays
/// testable without external dependencies. Every write validates its input
/// first; nothing that fails validation reaches the store.
pub struct Vault<S: DocumentStore, G: IdGenerator, C: Clock> {
    store: S,
    ids: G,
    clock: C,
}

/// Counts of what [`Vault::seed_demo`] inserted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub chats: usize,
    pub orders: usize,
    pub customers: usize,
}

impl<S: DocumentStore, G: IdGenerator, C: Clock> Vault<S, G, C> {
    pub fn new(store: S, ids: G, clock: C) -> Self {
        Self { store, ids, clock }
    }

    /// Access the underlying store (exposed for adapters and tests).
    pub fn store(&self) -> &S {
        &self.store
    }

    fn mint_id(&self) -> Result<RecordId, CoreError> {
        let seq = self.store.next_sequence()?;
        Ok(self.ids.next_id(seq))
    }

    // ---- orders -----------------------------------------------------------

    pub fn create_order(&self, input: NewOrder) -> Result<Order, CoreError> {
        validate_new_order(&input)?;
        let order = Order {
            id: self.mint_id()?,
            item: input.item.trim().to_string(),
            price: input.price,
        };
        self.store.insert_order(order.clone())?;
        Ok(order)
    }

    pub fn get_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        self.store.get_order(id)
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, CoreError> {
        self.store.list_orders()
    }

    /// Delete an order. Customers referencing it keep the now dangling id.
    pub fn delete_order(&self, id: &RecordId) -> Result<Order, CoreError> {
        self.store.remove_order(id)?.ok_or(CoreError::NotFound)
    }

    // ---- customers --------------------------------------------------------

    /// Create a customer. Every referenced order must exist and appear once.
    pub fn create_customer(&self, input: NewCustomer) -> Result<Customer, CoreError> {
        validate_new_customer(&input)?;
        for order_id in &input.orders {
            if self.store.get_order(order_id)?.is_none() {
                return Err(CoreError::UnknownReference(order_id.clone()));
            }
        }
        let customer = Customer {
            id: self.mint_id()?,
            name: input.name.trim().to_string(),
            orders: input.orders,
        };
        self.store.insert_customer(customer.clone())?;
        Ok(customer)
    }

    /// Append an order reference to a customer.
    ///
    /// The duplicate check and the append are separate store calls; two
    /// concurrent attaches of the same order can both pass the check.
    pub fn attach_order(
        &self,
        customer_id: &RecordId,
        order_id: &RecordId,
    ) -> Result<Customer, CoreError> {
        let mut customer = self
            .store
            .get_customer(customer_id)?
            .ok_or(CoreError::NotFound)?;
        if customer.orders.contains(order_id) {
            return Err(CoreError::DuplicateReference(order_id.clone()));
        }
        if self.store.get_order(order_id)?.is_none() {
            return Err(CoreError::UnknownReference(order_id.clone()));
        }
        self.store.push_order_ref(customer_id, order_id)?;
        customer.orders.push(order_id.clone());
        Ok(customer)
    }

    pub fn get_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        self.store.get_customer(id)
    }

    pub fn list_customers(&self) -> Result<Vec<Customer>, CoreError> {
        self.store.list_customers()
    }

    /// Read a customer and resolve its order references.
    pub fn populate_customer(
        &self,
        id: &RecordId,
    ) -> Result<Option<PopulatedCustomer>, CoreError> {
        match self.store.get_customer(id)? {
            Some(customer) => PopulatedCustomer::populate(customer, &self.store).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a customer and then every order it referenced that still exists.
    pub fn delete_customer(&self, id: &RecordId) -> Result<Customer, CoreError> {
        let customer = self.store.remove_customer(id)?.ok_or(CoreError::NotFound)?;
        for order_id in &customer.orders {
            self.store.remove_order(order_id)?;
        }
        Ok(customer)
    }

    // ---- chats ------------------------------------------------------------

    pub fn create_chat(&self, input: NewChat) -> Result<ChatMessage, CoreError> {
        validate_new_chat(&input)?;
        let chat = ChatMessage {
            id: self.mint_id()?,
            from: input.from.trim().to_string(),
            to: input.to.trim().to_string(),
            message: input.message,
            date: self.clock.now(),
        };
        self.store.insert_chat(chat.clone())?;
        Ok(chat)
    }

    pub fn get_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        self.store.get_chat(id)
    }

    pub fn list_chats(&self) -> Result<Vec<ChatMessage>, CoreError> {
        self.store.list_chats()
    }

    /// Replace the text of a chat message and return the updated record.
    pub fn update_chat_message(
        &self,
        id: &RecordId,
        message: &str,
    ) -> Result<ChatMessage, CoreError> {
        validate_chat_message(message)?;
        self.store
            .set_chat_message(id, message)?
            .ok_or(CoreError::NotFound)
    }

    pub fn delete_chat(&self, id: &RecordId) -> Result<ChatMessage, CoreError> {
        self.store.remove_chat(id)?.ok_or(CoreError::NotFound)
    }

    // ---- users (embedding) ------------------------------------------------

    pub fn create_user(&self, input: NewUser) -> Result<User, CoreError> {
        validate_new_user(&input)?;
        let user = User {
            id: self.mint_id()?,
            username: input.username.trim().to_string(),
            addresses: input.addresses,
        };
        self.store.insert_user(user.clone())?;
        Ok(user)
    }

    pub fn get_user(&self, id: &RecordId) -> Result<Option<User>, CoreError> {
        self.store.get_user(id)
    }

    pub fn list_users(&self) -> Result<Vec<User>, CoreError> {
        self.store.list_users()
    }

    pub fn add_address(&self, user_id: &RecordId, address: Address) -> Result<User, CoreError> {
        validate_address(&address)?;
        self.store.push_address(user_id, address)?;
        self.store.get_user(user_id)?.ok_or(CoreError::NotFound)
    }

    // ---- posts (parent referencing) ----------------------------------------

    pub fn create_post(&self, input: NewPost) -> Result<Post, CoreError> {
        validate_new_post(&input)?;
        if self.store.get_user(&input.author)?.is_none() {
            return Err(CoreError::UnknownReference(input.author));
        }
        let post = Post {
            id: self.mint_id()?,
            content: input.content,
            likes: input.likes,
            author: input.author,
        };
        self.store.insert_post(post.clone())?;
        Ok(post)
    }

    pub fn populate_post(&self, id: &RecordId) -> Result<Option<PopulatedPost>, CoreError> {
        match self.store.get_post(id)? {
            Some(post) => PopulatedPost::populate(post, &self.store).map(Some),
            None => Ok(None),
        }
    }

    pub fn list_posts_by_author(&self, author: &RecordId) -> Result<Vec<Post>, CoreError> {
        self.store.list_posts_by_author(author)
    }

    // ---- demo data ----------------------------------------------------------

    /// Insert the sample chats, orders and one customer referencing the first
    /// two orders. Does nothing when chats already exist.
    pub fn seed_demo(&self) -> Result<SeedReport, CoreError> {
        if !self.store.list_chats()?.is_empty() {
            return Ok(SeedReport::default());
        }
        let mut report = SeedReport::default();
        for chat in seed::sample_chats() {
            self.create_chat(chat)?;
            report.chats += 1;
        }
        let mut order_ids = Vec::new();
        for order in seed::sample_orders() {
            order_ids.push(self.create_order(order)?.id);
            report.orders += 1;
        }
        order_ids.truncate(2);
        self.create_customer(NewCustomer {
            name: seed::SAMPLE_CUSTOMER.to_string(),
            orders: order_ids,
        })?;
        report.customers += 1;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryStore;
    use crate::id::Base62IdGenerator;
    use std::time::{Duration, SystemTime};

    struct TestClock;
    impl Clock for TestClock {
        fn now(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
        }
    }

    fn vault() -> Vault<InMemoryStore, Base62IdGenerator, TestClock> {
        Vault::new(InMemoryStore::new(), Base62IdGenerator::default(), TestClock)
    }

    fn order(v: &Vault<InMemoryStore, Base62IdGenerator, TestClock>, item: &str, price: f64) -> Order {
        v.create_order(NewOrder {
            item: item.into(),
            price,
        })
        .unwrap()
    }

    #[test]
    fn populate_returns_referenced_orders_in_insertion_order() {
        let v = vault();
        let samosa = order(&v, "samosa", 12.0);
        let _chips = order(&v, "chips", 10.0);
        let chocolate = order(&v, "chocolate", 40.0);

        let customer = v
            .create_customer(NewCustomer {
                name: "Rahul Kumar".into(),
                orders: vec![samosa.id.clone(), chocolate.id.clone()],
            })
            .unwrap();

        let populated = v.populate_customer(&customer.id).unwrap().unwrap();
        assert_eq!(populated.orders, vec![samosa, chocolate]);
        assert_eq!(populated.orders[0].item, "samosa");
        assert_eq!(populated.orders[1].price, 40.0);
        assert!(populated.missing_orders.is_empty());
    }

    #[test]
    fn deleted_order_shortens_populated_view() {
        let v = vault();
        let a = order(&v, "samosa", 12.0);
        let b = order(&v, "chips", 10.0);
        let customer = v
            .create_customer(NewCustomer {
                name: "Rahul".into(),
                orders: vec![a.id.clone(), b.id.clone()],
            })
            .unwrap();

        v.delete_order(&a.id).unwrap();

        let populated = v.populate_customer(&customer.id).unwrap().unwrap();
        assert_eq!(populated.orders, vec![b]);
        assert_eq!(populated.missing_orders, vec![a.id]);
        assert!(populated.orders.len() <= customer.orders.len());
    }

    #[test]
    fn populate_missing_customer_is_none() {
        let v = vault();
        let missing = RecordId::new("nobody").unwrap();
        assert!(v.populate_customer(&missing).unwrap().is_none());
    }

    #[test]
    fn create_customer_rejects_unknown_and_duplicate_refs() {
        let v = vault();
        let a = order(&v, "samosa", 12.0);
        let ghost = RecordId::new("ghost").unwrap();

        let err = v
            .create_customer(NewCustomer {
                name: "Rahul".into(),
                orders: vec![a.id.clone(), ghost.clone()],
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownReference(id) if id == ghost));

        let err = v
            .create_customer(NewCustomer {
                name: "Rahul".into(),
                orders: vec![a.id.clone(), a.id.clone()],
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateReference(_)));
        assert!(v.list_customers().unwrap().is_empty());
    }

    #[test]
    fn attach_order_appends_once() {
        let v = vault();
        let a = order(&v, "samosa", 12.0);
        let b = order(&v, "chips", 10.0);
        let customer = v
            .create_customer(NewCustomer {
                name: "Rahul".into(),
                orders: vec![a.id.clone()],
            })
            .unwrap();

        let updated = v.attach_order(&customer.id, &b.id).unwrap();
        assert_eq!(updated.orders, vec![a.id.clone(), b.id.clone()]);

        let err = v.attach_order(&customer.id, &b.id).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateReference(_)));

        let stored = v.get_customer(&customer.id).unwrap().unwrap();
        assert_eq!(stored.orders.len(), 2);
    }

    #[test]
    fn attach_order_to_missing_customer_is_not_found() {
        let v = vault();
        let a = order(&v, "samosa", 12.0);
        let err = v
            .attach_order(&RecordId::new("nobody").unwrap(), &a.id)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
    }

    #[test]
    fn delete_customer_cascades_to_orders() {
        let v = vault();
        let a = order(&v, "samosa", 12.0);
        let b = order(&v, "chips", 10.0);
        let keep = order(&v, "chocolate", 40.0);
        let customer = v
            .create_customer(NewCustomer {
                name: "Rahul".into(),
                orders: vec![a.id.clone(), b.id.clone()],
            })
            .unwrap();
        // one reference is already dangling; the cascade must tolerate it
        v.delete_order(&a.id).unwrap();

        let removed = v.delete_customer(&customer.id).unwrap();
        assert_eq!(removed.name, "Rahul");
        assert!(v.get_customer(&customer.id).unwrap().is_none());
        assert_eq!(v.list_orders().unwrap(), vec![keep]);
    }

    #[test]
    fn invalid_order_never_reaches_store() {
        let v = vault();
        let err = v
            .create_order(NewOrder {
                item: "".into(),
                price: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidField { field: "item", .. }));
        assert!(v
            .create_order(NewOrder {
                item: "tea".into(),
                price: -5.0,
            })
            .is_err());
        assert!(v.list_orders().unwrap().is_empty());
    }

    #[test]
    fn chat_update_then_delete() {
        let v = vault();
        let chat = v
            .create_chat(NewChat {
                from: "neha".into(),
                to: "priya".into(),
                message: "send me your exam sheets".into(),
            })
            .unwrap();
        assert_eq!(chat.date, TestClock.now());

        let updated = v.update_chat_message(&chat.id, "never mind").unwrap();
        assert_eq!(updated.message, "never mind");
        assert_eq!(
            v.get_chat(&chat.id).unwrap().unwrap().message,
            "never mind"
        );

        let deleted = v.delete_chat(&chat.id).unwrap();
        assert_eq!(deleted.id, chat.id);
        assert!(v.get_chat(&chat.id).unwrap().is_none());
        assert!(matches!(
            v.delete_chat(&chat.id).unwrap_err(),
            CoreError::NotFound
        ));
    }

    #[test]
    fn chat_message_over_limit_is_rejected() {
        let v = vault();
        let err = v
            .create_chat(NewChat {
                from: "neha".into(),
                to: "priya".into(),
                message: "x".repeat(51),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidField { field: "message", .. }));
        assert!(v.list_chats().unwrap().is_empty());

        let chat = v
            .create_chat(NewChat {
                from: "neha".into(),
                to: "priya".into(),
                message: "short".into(),
            })
            .unwrap();
        assert!(v.update_chat_message(&chat.id, &"y".repeat(51)).is_err());
        assert_eq!(v.get_chat(&chat.id).unwrap().unwrap().message, "short");
    }

    #[test]
    fn user_addresses_are_embedded() {
        let v = vault();
        let user = v
            .create_user(NewUser {
                username: "sherlockholmes".into(),
                addresses: vec![Address {
                    location: "221B Baker Street".into(),
                    city: "London".into(),
                }],
            })
            .unwrap();
        let user = v
            .add_address(
                &user.id,
                Address {
                    location: "P32 WallStreet".into(),
                    city: "London".into(),
                },
            )
            .unwrap();
        assert_eq!(user.addresses.len(), 2);
        assert_eq!(user.addresses[1].location, "P32 WallStreet");
    }

    #[test]
    fn post_resolves_author_and_survives_unknown_author() {
        let v = vault();
        let author = v
            .create_user(NewUser {
                username: "rahul123".into(),
                addresses: vec![],
            })
            .unwrap();
        let post = v
            .create_post(NewPost {
                content: "Hello World".into(),
                likes: 7,
                author: author.id.clone(),
            })
            .unwrap();

        let populated = v.populate_post(&post.id).unwrap().unwrap();
        assert_eq!(populated.author, Some(author.clone()));
        assert_eq!(v.list_posts_by_author(&author.id).unwrap().len(), 1);

        let err = v
            .create_post(NewPost {
                content: "orphan".into(),
                likes: 0,
                author: RecordId::new("ghost").unwrap(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownReference(_)));
    }

    #[test]
    fn seed_demo_runs_once() {
        let v = vault();
        let report = v.seed_demo().unwrap();
        assert_eq!(report.chats, seed::sample_chats().len());
        assert_eq!(report.customers, 1);

        let customer = &v.list_customers().unwrap()[0];
        let populated = v.populate_customer(&customer.id).unwrap().unwrap();
        assert_eq!(populated.orders.len(), 2);

        assert_eq!(v.seed_demo().unwrap(), SeedReport::default());
    }

    #[test]
    fn ids_are_unique_across_record_kinds() {
        let v = vault();
        let o = order(&v, "samosa", 12.0);
        let c = v
            .create_chat(NewChat {
                from: "a".into(),
                to: "b".into(),
                message: "c".into(),
            })
            .unwrap();
        assert_ne!(o.id, c.id);
    }
}
