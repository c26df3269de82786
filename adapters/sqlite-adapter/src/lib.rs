//! sqlite-adapter — SQLite implementation of the document store ports.
//!
//! Purpose
//! - Provide a lightweight, file-based store to run the vault locally.
//! - Implements every repository trait from the `domain` crate, so a
//!   `SqliteStore` is a `domain::DocumentStore`.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Reference arrays (customer orders, user addresses) live in child tables
//!   keyed by `(parent_id, position)`; no foreign keys, so deleting an order
//!   leaves dangling references exactly like a schemaless store would.
//! - Stores timestamps as milliseconds since UNIX_EPOCH.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{
    Address, ChatMessage, ChatRepository, CoreError, Customer, CustomerRepository, Order,
    OrderRepository, Post, PostRepository, RecordId, SequenceRepository, User, UserRepository,
};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed document store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    /// Missing parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| CoreError::Repository(format!("create db dir: {e}")))?;
            }
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            item TEXT NOT NULL,
            price REAL NOT NULL
        );
        CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS customer_orders (
            customer_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            order_id TEXT NOT NULL,
            PRIMARY KEY (customer_id, position)
        );
        CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY,
            sender TEXT NOT NULL,
            recipient TEXT NOT NULL,
            message TEXT NOT NULL,
            sent_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS user_addresses (
            user_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            location TEXT NOT NULL,
            city TEXT NOT NULL,
            PRIMARY KEY (user_id, position)
        );
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            likes INTEGER NOT NULL DEFAULT 0,
            author_id TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

/// Map a unique-key violation to `AlreadyExists`, anything else to `Repository`.
fn map_insert_err(e: rusqlite::Error) -> CoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return CoreError::AlreadyExists;
        }
    }
    map_sqerr(e)
}

fn system_time_to_millis(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as i64
}

fn millis_to_system_time(ms: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms.max(0) as u64)
}

fn id_from_db(s: String) -> Result<RecordId, CoreError> {
    RecordId::new(s).map_err(|e| CoreError::Repository(format!("bad id in db: {e}")))
}

fn row_to_order(row: &rusqlite::Row) -> Result<Order, CoreError> {
    let id: String = row.get(0).map_err(map_sqerr)?;
    let item: String = row.get(1).map_err(map_sqerr)?;
    let price: f64 = row.get(2).map_err(map_sqerr)?;
    Ok(Order {
        id: id_from_db(id)?,
        item,
        price,
    })
}

fn row_to_chat(row: &rusqlite::Row) -> Result<ChatMessage, CoreError> {
    let id: String = row.get(0).map_err(map_sqerr)?;
    let from: String = row.get(1).map_err(map_sqerr)?;
    let to: String = row.get(2).map_err(map_sqerr)?;
    let message: String = row.get(3).map_err(map_sqerr)?;
    let sent_at: i64 = row.get(4).map_err(map_sqerr)?;
    Ok(ChatMessage {
        id: id_from_db(id)?,
        from,
        to,
        message,
        date: millis_to_system_time(sent_at),
    })
}

fn row_to_post(row: &rusqlite::Row) -> Result<Post, CoreError> {
    let id: String = row.get(0).map_err(map_sqerr)?;
    let content: String = row.get(1).map_err(map_sqerr)?;
    let likes: i64 = row.get(2).map_err(map_sqerr)?;
    let author: String = row.get(3).map_err(map_sqerr)?;
    Ok(Post {
        id: id_from_db(id)?,
        content,
        likes: u32::try_from(likes).map_err(|_| CoreError::Repository("bad likes in db".into()))?,
        author: id_from_db(author)?,
    })
}

fn load_order_refs(conn: &Connection, customer_id: &str) -> Result<Vec<RecordId>, CoreError> {
    let mut stmt = conn
        .prepare("SELECT order_id FROM customer_orders WHERE customer_id = ?1 ORDER BY position")
        .map_err(map_sqerr)?;
    let mut rows = stmt.query(params![customer_id]).map_err(map_sqerr)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(map_sqerr)? {
        out.push(id_from_db(row.get(0).map_err(map_sqerr)?)?);
    }
    Ok(out)
}

fn load_customer(conn: &Connection, id: &str) -> Result<Option<Customer>, CoreError> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM customers WHERE id = ?1", params![id], |r| r.get(0))
        .optional()
        .map_err(map_sqerr)?;
    match name {
        Some(name) => Ok(Some(Customer {
            id: id_from_db(id.to_string())?,
            name,
            orders: load_order_refs(conn, id)?,
        })),
        None => Ok(None),
    }
}

fn load_addresses(conn: &Connection, user_id: &str) -> Result<Vec<Address>, CoreError> {
    let mut stmt = conn
        .prepare("SELECT location, city FROM user_addresses WHERE user_id = ?1 ORDER BY position")
        .map_err(map_sqerr)?;
    let mut rows = stmt.query(params![user_id]).map_err(map_sqerr)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(map_sqerr)? {
        out.push(Address {
            location: row.get(0).map_err(map_sqerr)?,
            city: row.get(1).map_err(map_sqerr)?,
        });
    }
    Ok(out)
}

fn load_user(conn: &Connection, id: &str) -> Result<Option<User>, CoreError> {
    let username: Option<String> = conn
        .query_row("SELECT username FROM users WHERE id = ?1", params![id], |r| r.get(0))
        .optional()
        .map_err(map_sqerr)?;
    match username {
        Some(username) => Ok(Some(User {
            id: id_from_db(id.to_string())?,
            username,
            addresses: load_addresses(conn, id)?,
        })),
        None => Ok(None),
    }
}

/// Ids of a table in insertion order.
fn list_ids(conn: &Connection, table: &str) -> Result<Vec<String>, CoreError> {
    let mut stmt = conn
        .prepare(&format!("SELECT id FROM {table} ORDER BY rowid"))
        .map_err(map_sqerr)?;
    let mut rows = stmt.query([]).map_err(map_sqerr)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(map_sqerr)? {
        out.push(row.get(0).map_err(map_sqerr)?);
    }
    Ok(out)
}

impl SequenceRepository for SqliteStore {
    /// Atomically increment the global counter and return the new value.
    fn next_sequence(&self) -> Result<u64, CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        tx.execute(
            "INSERT OR IGNORE INTO counters(name, value) VALUES('global', 0)",
            [],
        )
        .map_err(map_sqerr)?;
        tx.execute(
            "UPDATE counters SET value = value + 1 WHERE name = 'global'",
            [],
        )
        .map_err(map_sqerr)?;
        let val: i64 = tx
            .query_row(
                "SELECT value FROM counters WHERE name = 'global'",
                [],
                |row| row.get(0),
            )
            .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)?;
        Ok(val as u64)
    }
}

impl OrderRepository for SqliteStore {
    fn insert_order(&self, order: Order) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO orders(id, item, price) VALUES (?1, ?2, ?3)",
            params![order.id.as_str(), order.item, order.price],
        )
        .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, item, price FROM orders WHERE id = ?1")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![id.as_str()]).map_err(map_sqerr)?;
        match rows.next().map_err(map_sqerr)? {
            Some(row) => Ok(Some(row_to_order(row)?)),
            None => Ok(None),
        }
    }

    fn list_orders(&self) -> Result<Vec<Order>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, item, price FROM orders ORDER BY rowid")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query([]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_order(row)?);
        }
        Ok(out)
    }

    fn remove_order(&self, id: &RecordId) -> Result<Option<Order>, CoreError> {
        let conn = self.lock()?;
        let existing = conn
            .query_row(
                "SELECT id, item, price FROM orders WHERE id = ?1",
                params![id.as_str()],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, f64>(2)?)),
            )
            .optional()
            .map_err(map_sqerr)?;
        let Some((oid, item, price)) = existing else {
            return Ok(None);
        };
        conn.execute("DELETE FROM orders WHERE id = ?1", params![id.as_str()])
            .map_err(map_sqerr)?;
        Ok(Some(Order {
            id: id_from_db(oid)?,
            item,
            price,
        }))
    }
}

impl CustomerRepository for SqliteStore {
    fn insert_customer(&self, customer: Customer) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        tx.execute(
            "INSERT INTO customers(id, name) VALUES (?1, ?2)",
            params![customer.id.as_str(), customer.name],
        )
        .map_err(map_insert_err)?;
        for (pos, order_id) in customer.orders.iter().enumerate() {
            tx.execute(
                "INSERT INTO customer_orders(customer_id, position, order_id) VALUES (?1, ?2, ?3)",
                params![customer.id.as_str(), pos as i64, order_id.as_str()],
            )
            .map_err(map_sqerr)?;
        }
        tx.commit().map_err(map_sqerr)
    }

    fn get_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        let conn = self.lock()?;
        load_customer(&conn, id.as_str())
    }

    fn list_customers(&self) -> Result<Vec<Customer>, CoreError> {
        let conn = self.lock()?;
        let mut out = Vec::new();
        for id in list_ids(&conn, "customers")? {
            if let Some(customer) = load_customer(&conn, &id)? {
                out.push(customer);
            }
        }
        Ok(out)
    }

    fn push_order_ref(
        &self,
        customer_id: &RecordId,
        order_id: &RecordId,
    ) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM customers WHERE id = ?1",
                params![customer_id.as_str()],
                |r| r.get(0),
            )
            .optional()
            .map_err(map_sqerr)?;
        if exists.is_none() {
            return Err(CoreError::NotFound);
        }
        tx.execute(
            "INSERT INTO customer_orders(customer_id, position, order_id)
             SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2 FROM customer_orders WHERE customer_id = ?1",
            params![customer_id.as_str(), order_id.as_str()],
        )
        .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)
    }

    fn remove_customer(&self, id: &RecordId) -> Result<Option<Customer>, CoreError> {
        let conn = self.lock()?;
        let Some(customer) = load_customer(&conn, id.as_str())? else {
            return Ok(None);
        };
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        tx.execute("DELETE FROM customer_orders WHERE customer_id = ?1", params![id.as_str()])
            .map_err(map_sqerr)?;
        tx.execute("DELETE FROM customers WHERE id = ?1", params![id.as_str()])
            .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)?;
        Ok(Some(customer))
    }
}

impl ChatRepository for SqliteStore {
    fn insert_chat(&self, chat: ChatMessage) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO chats(id, sender, recipient, message, sent_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chat.id.as_str(),
                chat.from,
                chat.to,
                chat.message,
                system_time_to_millis(chat.date),
            ],
        )
        .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        let conn = self.lock()?;
        get_chat_row(&conn, id.as_str())
    }

    fn list_chats(&self) -> Result<Vec<ChatMessage>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, sender, recipient, message, sent_at FROM chats ORDER BY rowid")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query([]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_chat(row)?);
        }
        Ok(out)
    }

    fn set_chat_message(
        &self,
        id: &RecordId,
        message: &str,
    ) -> Result<Option<ChatMessage>, CoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE chats SET message = ?1 WHERE id = ?2",
                params![message, id.as_str()],
            )
            .map_err(map_sqerr)?;
        if changed == 0 {
            return Ok(None);
        }
        get_chat_row(&conn, id.as_str())
    }

    fn remove_chat(&self, id: &RecordId) -> Result<Option<ChatMessage>, CoreError> {
        let conn = self.lock()?;
        let Some(chat) = get_chat_row(&conn, id.as_str())? else {
            return Ok(None);
        };
        conn.execute("DELETE FROM chats WHERE id = ?1", params![id.as_str()])
            .map_err(map_sqerr)?;
        Ok(Some(chat))
    }
}

fn get_chat_row(conn: &Connection, id: &str) -> Result<Option<ChatMessage>, CoreError> {
    let mut stmt = conn
        .prepare("SELECT id, sender, recipient, message, sent_at FROM chats WHERE id = ?1")
        .map_err(map_sqerr)?;
    let mut rows = stmt.query(params![id]).map_err(map_sqerr)?;
    match rows.next().map_err(map_sqerr)? {
        Some(row) => Ok(Some(row_to_chat(row)?)),
        None => Ok(None),
    }
}

impl UserRepository for SqliteStore {
    fn insert_user(&self, user: User) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        tx.execute(
            "INSERT INTO users(id, username) VALUES (?1, ?2)",
            params![user.id.as_str(), user.username],
        )
        .map_err(map_insert_err)?;
        for (pos, address) in user.addresses.iter().enumerate() {
            tx.execute(
                "INSERT INTO user_addresses(user_id, position, location, city) VALUES (?1, ?2, ?3, ?4)",
                params![user.id.as_str(), pos as i64, address.location, address.city],
            )
            .map_err(map_sqerr)?;
        }
        tx.commit().map_err(map_sqerr)
    }

    fn get_user(&self, id: &RecordId) -> Result<Option<User>, CoreError> {
        let conn = self.lock()?;
        load_user(&conn, id.as_str())
    }

    fn list_users(&self) -> Result<Vec<User>, CoreError> {
        let conn = self.lock()?;
        let mut out = Vec::new();
        for id in list_ids(&conn, "users")? {
            if let Some(user) = load_user(&conn, &id)? {
                out.push(user);
            }
        }
        Ok(out)
    }

    fn push_address(&self, user_id: &RecordId, address: Address) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![user_id.as_str()],
                |r| r.get(0),
            )
            .optional()
            .map_err(map_sqerr)?;
        if exists.is_none() {
            return Err(CoreError::NotFound);
        }
        tx.execute(
            "INSERT INTO user_addresses(user_id, position, location, city)
             SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2, ?3 FROM user_addresses WHERE user_id = ?1",
            params![user_id.as_str(), address.location, address.city],
        )
        .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)
    }
}

impl PostRepository for SqliteStore {
    fn insert_post(&self, post: Post) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO posts(id, content, likes, author_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                post.id.as_str(),
                post.content,
                post.likes as i64,
                post.author.as_str(),
            ],
        )
        .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_post(&self, id: &RecordId) -> Result<Option<Post>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, content, likes, author_id FROM posts WHERE id = ?1")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![id.as_str()]).map_err(map_sqerr)?;
        match rows.next().map_err(map_sqerr)? {
            Some(row) => Ok(Some(row_to_post(row)?)),
            None => Ok(None),
        }
    }

    fn list_posts_by_author(&self, author: &RecordId) -> Result<Vec<Post>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, content, likes, author_id FROM posts WHERE author_id = ?1 ORDER BY rowid",
            )
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![author.as_str()]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_post(row)?);
        }
        Ok(out)
    }
}
