use std::env;
use std::process;

use domain::adapters::memory_store::InMemoryStore;
use domain::id::Base62IdGenerator;
use domain::service::Vault;
use domain::{Address, CoreError, NewChat, NewCustomer, NewOrder, NewPost, NewUser, StdClock};

type DemoVault = Vault<InMemoryStore, Base62IdGenerator, StdClock>;

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain reference [--drop-first]\n  domain embed\n  domain parent\n  domain chat <from> <to> <message>\n\nNotes:\n  - This demo CLI uses an in-memory store; data is not persisted across runs.",
        domain::about()
    );
}

/// Three orders, one customer referencing two of them, then populate.
fn reference_demo(vault: &DemoVault, drop_first: bool) -> Result<(), CoreError> {
    let mut ids = Vec::new();
    for (item, price) in [("samosa", 12.0), ("chips", 10.0), ("chocolate", 40.0)] {
        let order = vault.create_order(NewOrder {
            item: item.to_string(),
            price,
        })?;
        println!("order {} -> {} @ {}", order.id, order.item, order.price);
        ids.push(order.id);
    }
    let customer = vault.create_customer(NewCustomer {
        name: "Rahul Kumar".into(),
        orders: vec![ids[0].clone(), ids[2].clone()],
    })?;
    println!("customer {} stores refs {:?}", customer.id, customer.orders);

    if drop_first {
        let removed = vault.delete_order(&ids[0])?;
        println!("deleted order {} ({})", removed.id, removed.item);
    }

    match vault.populate_customer(&customer.id)? {
        Some(populated) => {
            println!("populated {}:", populated.name);
            for order in &populated.orders {
                println!("  - {} {} @ {}", order.id, order.item, order.price);
            }
            for missing in &populated.missing_orders {
                println!("  - {} (dangling)", missing);
            }
        }
        None => println!("customer vanished"),
    }
    Ok(())
}

/// A user with addresses stored inline.
fn embed_demo(vault: &DemoVault) -> Result<(), CoreError> {
    let user = vault.create_user(NewUser {
        username: "sherlockholmes".into(),
        addresses: vec![Address {
            location: "221B Baker Street".into(),
            city: "London".into(),
        }],
    })?;
    let user = vault.add_address(
        &user.id,
        Address {
            location: "P32 WallStreet".into(),
            city: "London".into(),
        },
    )?;
    println!("user {} ({})", user.id, user.username);
    for address in &user.addresses {
        println!("  - {}, {}", address.location, address.city);
    }
    Ok(())
}

/// Posts that point back at their author.
fn parent_demo(vault: &DemoVault) -> Result<(), CoreError> {
    let author = vault.create_user(NewUser {
        username: "rahul".into(),
        addresses: vec![],
    })?;
    for (content, likes) in [("Hello World", 7), ("Bye Bye :)", 23)] {
        vault.create_post(NewPost {
            content: content.into(),
            likes,
            author: author.id.clone(),
        })?;
    }
    for post in vault.list_posts_by_author(&author.id)? {
        if let Some(populated) = vault.populate_post(&post.id)? {
            let by = populated
                .author
                .map(|u| u.username)
                .unwrap_or_else(|| "<unknown>".into());
            println!("post {} by {}: {} ({} likes)", populated.id, by, populated.content, populated.likes);
        }
    }
    Ok(())
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let vault = Vault::new(InMemoryStore::new(), Base62IdGenerator::default(), StdClock);

    match cmd.as_str() {
        "reference" => {
            let drop_first = match args.next().as_deref() {
                None => false,
                Some("--drop-first") => true,
                Some(unk) => return Err(format!("unknown argument: {}", unk)),
            };
            reference_demo(&vault, drop_first).map_err(|e| format!("reference demo failed: {}", e))
        }
        "embed" => embed_demo(&vault).map_err(|e| format!("embed demo failed: {}", e)),
        "parent" => parent_demo(&vault).map_err(|e| format!("parent demo failed: {}", e)),
        "chat" => {
            let (Some(from), Some(to), Some(message)) = (args.next(), args.next(), args.next())
            else {
                return Err("chat requires <from> <to> <message>".into());
            };
            match vault.create_chat(NewChat { from, to, message }) {
                Ok(chat) => {
                    println!("chat {}: {} -> {}: {}", chat.id, chat.from, chat.to, chat.message);
                    Ok(())
                }
                Err(e) => Err(format!("chat rejected: {}", e)),
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
