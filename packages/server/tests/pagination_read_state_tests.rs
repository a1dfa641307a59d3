//! Message paging and read state.
//!
//! Pages are requested newest first and returned oldest first; only the
//! initial page marks messages as read.

mod common;

use axum::http::StatusCode;
use chat_core::common::ConversationId;
use chat_core::domains::chat::ChatEvent;
use chat_core::kernel::user_topic;
use serde_json::{json, Value};
use test_context::test_context;

use crate::common::{TestHarness, TestUser};

fn contents(page: &Value) -> Vec<String> {
    page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect()
}

async fn page(
    ctx: &TestHarness,
    user: &TestUser,
    conversation: ConversationId,
    limit: i64,
    offset: i64,
) -> Value {
    let (status, body) = ctx
        .api()
        .get(
            &format!(
                "/api/chat/conversations/{}/messages?limit={}&offset={}",
                conversation, limit, offset
            ),
            &user.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "page request failed: {}", body);
    body
}

async fn unread(ctx: &TestHarness, user: &TestUser) -> i64 {
    let (status, body) = ctx.api().get("/api/chat/unread-count", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    body["count"].as_i64().unwrap()
}

/// Walk every page the way a client does and stitch them back together.
async fn load_all(
    ctx: &TestHarness,
    user: &TestUser,
    conversation: ConversationId,
    limit: i64,
) -> (Vec<String>, usize) {
    let mut all: Vec<String> = Vec::new();
    let mut offset = 0;
    let mut requests = 0;
    loop {
        let body = page(ctx, user, conversation, limit, offset).await;
        requests += 1;
        let mut chunk = contents(&body);
        offset += chunk.len() as i64;
        chunk.extend(all);
        all = chunk;
        if !body["has_more"].as_bool().unwrap() {
            break;
        }
    }
    (all, requests)
}

fn numbered(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("msg {}", i)).collect()
}

#[test_context(TestHarness)]
#[tokio::test]
async fn initial_page_marks_read_and_second_page_finishes(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let admin = ctx.admin().await;
    let conversation = ctx.conversation(&customer, "Suporte").await;
    ctx.seed_messages(conversation, &admin, 25).await;

    assert_eq!(unread(ctx, &customer).await, 25);

    let first = page(ctx, &customer, conversation, 20, 0).await;
    assert_eq!(contents(&first), numbered(25)[5..].to_vec());
    assert_eq!(first["has_more"], true);
    assert_eq!(unread(ctx, &customer).await, 0);

    let second = page(ctx, &customer, conversation, 20, 20).await;
    assert_eq!(contents(&second), numbered(5));
    assert_eq!(second["has_more"], false);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn load_more_does_not_mark_read(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let admin = ctx.admin().await;
    let conversation = ctx.conversation(&customer, "Suporte").await;
    ctx.seed_messages(conversation, &admin, 4).await;

    let body = page(ctx, &customer, conversation, 2, 2).await;
    assert_eq!(contents(&body), numbered(2));
    assert_eq!(unread(ctx, &customer).await, 4);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn pages_reconstruct_full_history(ctx: &TestHarness) {
    let customer = ctx.customer().await;

    // Not a multiple of the limit
    let uneven = ctx.conversation(&customer, "Irregular").await;
    ctx.seed_messages(uneven, &customer, 7).await;
    let (all, requests) = load_all(ctx, &customer, uneven, 3).await;
    assert_eq!(all, numbered(7));
    assert_eq!(requests, 3);

    // Exact multiple: the last full page still reports has_more and the
    // follow-up comes back empty
    let even = ctx.conversation(&customer, "Exata").await;
    ctx.seed_messages(even, &customer, 6).await;
    let (all, requests) = load_all(ctx, &customer, even, 3).await;
    assert_eq!(all, numbered(6));
    assert_eq!(requests, 3);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn empty_conversation_has_no_more(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let conversation = ctx.conversation(&customer, "Vazia").await;

    let body = page(ctx, &customer, conversation, 20, 0).await;
    assert!(contents(&body).is_empty());
    assert_eq!(body["has_more"], false);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn page_parameters_are_clamped(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let conversation = ctx.conversation(&customer, "Limites").await;

    let body = page(ctx, &customer, conversation, 0, -5).await;
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);

    let body = page(ctx, &customer, conversation, 1000, 0).await;
    assert_eq!(body["limit"], 100);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unread_count_zero_one_many(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let admin = ctx.admin().await;
    let conversation = ctx.conversation(&customer, "Contagem").await;

    assert_eq!(unread(ctx, &customer).await, 0);

    // Own messages never count
    ctx.seed_messages(conversation, &customer, 3).await;
    assert_eq!(unread(ctx, &customer).await, 0);

    ctx.seed_messages(conversation, &admin, 1).await;
    assert_eq!(unread(ctx, &customer).await, 1);

    let other = ctx.conversation(&customer, "Outra").await;
    ctx.seed_messages(other, &admin, 4).await;
    assert_eq!(unread(ctx, &customer).await, 5);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn admin_unread_ignores_other_admins(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let admin = ctx.admin().await;
    let colleague = ctx.admin().await;
    let conversation = ctx.conversation(&customer, "Equipe").await;
    ctx.seed_messages(conversation, &colleague, 2).await;
    ctx.seed_messages(conversation, &customer, 3).await;

    let (_, list) = ctx.api().get("/api/chat/conversations", &admin.token).await;
    let summary = list
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == conversation.to_string())
        .cloned()
        .unwrap();
    assert_eq!(summary["unread_count"], 3);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn read_marking_is_idempotent(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let admin = ctx.admin().await;
    let conversation = ctx.conversation(&customer, "Repetida").await;
    ctx.seed_messages(conversation, &admin, 3).await;
    let mut feed = ctx.deps.stream_hub.subscribe(&user_topic(customer.id)).await;

    page(ctx, &customer, conversation, 20, 0).await;
    match serde_json::from_value(feed.recv().await.unwrap()).unwrap() {
        ChatEvent::MessagesRead { reader_id, count, .. } => {
            assert_eq!(reader_id, customer.id);
            assert_eq!(count, 3);
        }
        other => panic!("unexpected event {:?}", other),
    }

    let again = page(ctx, &customer, conversation, 20, 0).await;
    assert_eq!(unread(ctx, &customer).await, 0);
    assert!(again["messages"]
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["is_read"] == true));

    // Nothing flipped the second time, so nothing was published
    assert!(feed.try_recv().is_err());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reading_does_not_mark_own_messages(ctx: &TestHarness) {
    let customer = ctx.customer().await;
    let admin = ctx.admin().await;
    let conversation = ctx.conversation(&customer, "Mista").await;
    ctx.seed_messages(conversation, &customer, 2).await;

    page(ctx, &customer, conversation, 20, 0).await;
    let body = page(ctx, &admin, conversation, 20, 0).await;

    // Returned rows were selected before the admin's read-marking ran
    assert!(body["messages"].as_array().unwrap().iter().all(|m| m["is_read"] == false));

    let (status, body) = ctx
        .api()
        .post(
            &format!("/api/chat/conversations/{}/messages", conversation),
            &customer.token,
            json!({ "content": "mais uma" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_read"], false);
}
