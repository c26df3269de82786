//! JSON routes for orders, customers, users and posts.
//!
//! Customers reference orders by id and are returned populated. Users embed
//! their addresses. Posts point at their author, who is resolved on read.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::resolve::{PopulatedCustomer, PopulatedPost};
use domain::{
    Address, CoreError, Customer, NewCustomer, NewOrder, NewPost, NewUser, Order, Post, RecordId,
    User,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiJson};
use crate::AppState;

fn parse_id(raw: String) -> Result<RecordId, ApiError> {
    Ok(RecordId::new(raw)?)
}

// ---- orders -----------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateOrderReq {
    item: String,
    price: f64,
}

#[derive(Serialize)]
pub struct OrderOut {
    id: String,
    item: String,
    price: f64,
}

impl From<Order> for OrderOut {
    fn from(o: Order) -> Self {
        Self {
            id: o.id.to_string(),
            item: o.item,
            price: o.price,
        }
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateOrderReq>,
) -> Result<(StatusCode, Json<OrderOut>), ApiError> {
    let order = state.vault.create_order(NewOrder {
        item: body.item,
        price: body.price,
    })?;
    info!(id = %order.id, item = %order.item, "order created");
    Ok((StatusCode::CREATED, Json(order.into())))
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<OrderOut>>, ApiError> {
    let orders = state.vault.list_orders()?;
    Ok(Json(orders.into_iter().map(OrderOut::from).collect()))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderOut>, ApiError> {
    let order = state.vault.delete_order(&parse_id(id)?)?;
    info!(id = %order.id, "order deleted");
    Ok(Json(order.into()))
}

// ---- customers ----------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateCustomerReq {
    name: String,
    #[serde(default)]
    orders: Vec<RecordId>,
}

#[derive(Deserialize)]
pub struct AttachOrderReq {
    order_id: RecordId,
}

/// Customer as stored: order ids only.
#[derive(Serialize)]
pub struct CustomerOut {
    id: String,
    name: String,
    orders: Vec<RecordId>,
}

impl From<Customer> for CustomerOut {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name,
            orders: c.orders,
        }
    }
}

/// Customer with its order ids replaced by the order records.
#[derive(Serialize)]
pub struct PopulatedCustomerOut {
    id: String,
    name: String,
    orders: Vec<OrderOut>,
    missing_orders: Vec<RecordId>,
}

impl From<PopulatedCustomer> for PopulatedCustomerOut {
    fn from(c: PopulatedCustomer) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name,
            orders: c.orders.into_iter().map(OrderOut::from).collect(),
            missing_orders: c.missing_orders,
        }
    }
}

pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateCustomerReq>,
) -> Result<(StatusCode, Json<CustomerOut>), ApiError> {
    let customer = state.vault.create_customer(NewCustomer {
        name: body.name,
        orders: body.orders,
    })?;
    info!(id = %customer.id, orders = customer.orders.len(), "customer created");
    Ok((StatusCode::CREATED, Json(customer.into())))
}

pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerOut>>, ApiError> {
    let customers = state.vault.list_customers()?;
    Ok(Json(customers.into_iter().map(CustomerOut::from).collect()))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PopulatedCustomerOut>, ApiError> {
    let populated = state
        .vault
        .populate_customer(&parse_id(id)?)?
        .ok_or(CoreError::NotFound)?;
    Ok(Json(populated.into()))
}

pub async fn attach_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AttachOrderReq>,
) -> Result<Json<CustomerOut>, ApiError> {
    let customer = state.vault.attach_order(&parse_id(id)?, &body.order_id)?;
    info!(id = %customer.id, order = %body.order_id, "order attached");
    Ok(Json(customer.into()))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerOut>, ApiError> {
    let customer = state.vault.delete_customer(&parse_id(id)?)?;
    info!(id = %customer.id, orders = customer.orders.len(), "customer deleted with its orders");
    Ok(Json(customer.into()))
}

// ---- users --------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct AddressDto {
    location: String,
    city: String,
}

impl From<Address> for AddressDto {
    fn from(a: Address) -> Self {
        Self {
            location: a.location,
            city: a.city,
        }
    }
}

impl From<AddressDto> for Address {
    fn from(a: AddressDto) -> Self {
        Self {
            location: a.location,
            city: a.city,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateUserReq {
    username: String,
    #[serde(default)]
    addresses: Vec<AddressDto>,
}

#[derive(Serialize)]
pub struct UserOut {
    id: String,
    username: String,
    addresses: Vec<AddressDto>,
}

impl From<User> for UserOut {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username,
            addresses: u.addresses.into_iter().map(AddressDto::from).collect(),
        }
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserReq>,
) -> Result<(StatusCode, Json<UserOut>), ApiError> {
    let user = state.vault.create_user(NewUser {
        username: body.username,
        addresses: body.addresses.into_iter().map(Address::from).collect(),
    })?;
    info!(id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = state.vault.list_users()?;
    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserOut>, ApiError> {
    let user = state
        .vault
        .get_user(&parse_id(id)?)?
        .ok_or(CoreError::NotFound)?;
    Ok(Json(user.into()))
}

pub async fn add_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AddressDto>,
) -> Result<Json<UserOut>, ApiError> {
    let user = state.vault.add_address(&parse_id(id)?, body.into())?;
    info!(id = %user.id, addresses = user.addresses.len(), "address added");
    Ok(Json(user.into()))
}

// ---- posts --------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePostReq {
    content: String,
    #[serde(default)]
    likes: u32,
    author: RecordId,
}

#[derive(Serialize)]
pub struct PostOut {
    id: String,
    content: String,
    likes: u32,
    author: RecordId,
}

impl From<Post> for PostOut {
    fn from(p: Post) -> Self {
        Self {
            id: p.id.to_string(),
            content: p.content,
            likes: p.likes,
            author: p.author,
        }
    }
}

/// Post with the author record in place of the id. `author` is null when the
/// user no longer exists.
#[derive(Serialize)]
pub struct PopulatedPostOut {
    id: String,
    content: String,
    likes: u32,
    author_id: RecordId,
    author: Option<UserOut>,
}

impl From<PopulatedPost> for PopulatedPostOut {
    fn from(p: PopulatedPost) -> Self {
        Self {
            id: p.id.to_string(),
            content: p.content,
            likes: p.likes,
            author_id: p.author_id,
            author: p.author.map(UserOut::from),
        }
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreatePostReq>,
) -> Result<(StatusCode, Json<PostOut>), ApiError> {
    let post = state.vault.create_post(NewPost {
        content: body.content,
        likes: body.likes,
        author: body.author,
    })?;
    info!(id = %post.id, author = %post.author, "post created");
    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PopulatedPostOut>, ApiError> {
    let post = state
        .vault
        .populate_post(&parse_id(id)?)?
        .ok_or(CoreError::NotFound)?;
    Ok(Json(post.into()))
}

pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PostOut>>, ApiError> {
    let posts = state.vault.list_posts_by_author(&parse_id(id)?)?;
    Ok(Json(posts.into_iter().map(PostOut::from).collect()))
}
