//! Chat pages: server-rendered HTML over the chat collection.

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};
use domain::validate::MAX_CHAT_MESSAGE_CHARS;
use domain::{ChatMessage, CoreError, NewChat, RecordId};
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::AppState;

/// Chat fields prepared for display.
pub struct ChatView {
    pub id: String,
    pub from: String,
    pub to: String,
    pub message: String,
    pub date: String,
    pub sent_at: String,
}

impl From<ChatMessage> for ChatView {
    fn from(chat: ChatMessage) -> Self {
        Self {
            id: chat.id.to_string(),
            from: chat.from,
            to: chat.to,
            message: chat.message,
            date: http_common::system_time_to_display(chat.date),
            sent_at: http_common::system_time_to_rfc3339(chat.date),
        }
    }
}

#[derive(Template)]
#[template(path = "chats/index.html")]
struct IndexPage {
    chats: Vec<ChatView>,
}

#[derive(Template)]
#[template(path = "chats/new.html")]
struct NewPage {
    max_len: usize,
}

#[derive(Template)]
#[template(path = "chats/show.html")]
struct ShowPage {
    chat: ChatView,
}

#[derive(Template)]
#[template(path = "chats/edit.html")]
struct EditPage {
    chat: ChatView,
    max_len: usize,
}

fn render<T: Template>(page: T) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}

fn load_chat(state: &AppState, raw_id: String) -> Result<ChatMessage, AppError> {
    let id = RecordId::new(raw_id)?;
    state
        .vault
        .get_chat(&id)?
        .ok_or(AppError::Core(CoreError::NotFound))
}

#[derive(Deserialize)]
pub struct NewChatForm {
    from: String,
    to: String,
    msg: String,
}

#[derive(Deserialize)]
pub struct EditChatForm {
    msg: String,
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let chats = state
        .vault
        .list_chats()?
        .into_iter()
        .map(ChatView::from)
        .collect();
    render(IndexPage { chats })
}

pub async fn new_form() -> Result<Html<String>, AppError> {
    render(NewPage {
        max_len: MAX_CHAT_MESSAGE_CHARS,
    })
}

pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<NewChatForm>,
) -> Result<Redirect, AppError> {
    let chat = state.vault.create_chat(NewChat {
        from: form.from,
        to: form.to,
        message: form.msg,
    })?;
    info!(id = %chat.id, from = %chat.from, to = %chat.to, "chat created");
    Ok(Redirect::to("/chats"))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let chat = load_chat(&state, id)?;
    render(ShowPage { chat: chat.into() })
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let chat = load_chat(&state, id)?;
    render(EditPage {
        chat: chat.into(),
        max_len: MAX_CHAT_MESSAGE_CHARS,
    })
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<EditChatForm>,
) -> Result<Redirect, AppError> {
    let id = RecordId::new(id)?;
    let chat = state.vault.update_chat_message(&id, &form.msg)?;
    info!(id = %chat.id, "chat updated");
    Ok(Redirect::to("/chats"))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id = RecordId::new(id)?;
    let chat = state.vault.delete_chat(&id)?;
    info!(id = %chat.id, "chat deleted");
    Ok(Redirect::to("/chats"))
}
