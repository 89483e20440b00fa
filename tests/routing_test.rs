mod common;

use std::sync::Arc;

use askbot::bot::{route, Inbound};
use askbot::db::MemoryKv;
use askbot::error::{ConversationError, COMPLETION_FAILED_REPLY};

use common::{test_config, test_state, DownKv, Outgoing, RecordingMessenger, ScriptedCompletion};

fn inbound(text: &str) -> Inbound {
    Inbound {
        chat_id: 100,
        user_id: 5,
        first_name: Some("Ada".to_string()),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn start_greets_by_first_name() {
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(MemoryKv::new()),
        ScriptedCompletion::new(),
        messenger.clone(),
    );

    route(&state, inbound("/start")).await.unwrap();

    let text = messenger.last_text().unwrap();
    assert!(text.starts_with("Hello, Ada!"));
}

#[tokio::test]
async fn help_lists_the_commands() {
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(MemoryKv::new()),
        ScriptedCompletion::new(),
        messenger.clone(),
    );

    route(&state, inbound("/help")).await.unwrap();

    let text = messenger.last_text().unwrap();
    assert!(text.contains("/ask"));
    assert!(text.contains("/end"));
}

#[tokio::test]
async fn ask_then_free_text_goes_to_the_conversation() {
    let completion = ScriptedCompletion::new().reply("first answer").reply("second answer");
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(MemoryKv::new()),
        completion.clone(),
        messenger.clone(),
    );

    route(&state, inbound("/ask@askbot how are you?")).await.unwrap();
    route(&state, inbound("and now?")).await.unwrap();

    assert_eq!(messenger.last_text().as_deref(), Some("second answer"));
    let calls = completion.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].len(), 4);
    assert_eq!(calls[1][1].content, "how are you?");
}

#[tokio::test]
async fn translate_uses_a_one_shot_history() {
    let completion = ScriptedCompletion::new().reply("Hello");
    let messenger = RecordingMessenger::new();
    let kv = Arc::new(MemoryKv::new());
    let state = test_state(
        test_config(&[]),
        kv.clone(),
        completion.clone(),
        messenger.clone(),
    );

    route(&state, inbound("/t 你好")).await.unwrap();

    let calls = completion.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0][1].content, "你好");
    assert_eq!(messenger.texts(), vec!["⏳ Translating...", "Hello"]);
    assert!(kv.raw("conversation_ask").await.is_none());
}

#[tokio::test]
async fn failed_translation_tells_the_user() {
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(MemoryKv::new()),
        ScriptedCompletion::new().fail(),
        messenger.clone(),
    );

    route(&state, inbound("/t hello")).await.unwrap();

    assert_eq!(messenger.last_text().as_deref(), Some(COMPLETION_FAILED_REPLY));
}

#[tokio::test]
async fn unknown_commands_are_ignored() {
    let completion = ScriptedCompletion::new();
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(MemoryKv::new()),
        completion.clone(),
        messenger.clone(),
    );

    route(&state, inbound("/weather tomorrow")).await.unwrap();

    assert!(messenger.outgoing().is_empty());
    assert!(completion.calls().is_empty());
}

#[tokio::test]
async fn rejected_text_is_answered_but_not_an_error() {
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(MemoryKv::new()),
        ScriptedCompletion::new(),
        messenger.clone(),
    );

    route(&state, inbound("hello?")).await.unwrap();

    assert_eq!(messenger.outgoing().len(), 1);
    assert!(matches!(&messenger.outgoing()[0], Outgoing::Sent { chat_id: 100, .. }));
}

#[tokio::test]
async fn store_failures_propagate_to_the_caller() {
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        Arc::new(DownKv),
        ScriptedCompletion::new(),
        messenger.clone(),
    );

    let err = route(&state, inbound("/ask hi")).await.unwrap_err();

    assert!(matches!(err, ConversationError::StoreUnavailable(_)));
    assert!(messenger.last_text().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn corrupted_store_is_answered_once_and_not_retried() {
    let kv = Arc::new(MemoryKv::new());
    kv.insert_raw("conversation_ask", r#"{"bad": {}}"#).await;
    let completion = ScriptedCompletion::new();
    let messenger = RecordingMessenger::new();
    let state = test_state(
        test_config(&[]),
        kv.clone(),
        completion.clone(),
        messenger.clone(),
    );

    for text in ["hello", "/ask hi", "/end"] {
        route(&state, inbound(text)).await.unwrap();
    }

    let notices = messenger.texts();
    assert_eq!(notices.len(), 3);
    for notice in &notices {
        assert!(notice.contains("could not be read"));
        assert!(!notice.contains("/ask"));
    }
    assert!(completion.calls().is_empty());
    assert_eq!(
        kv.raw("conversation_ask").await.as_deref(),
        Some(r#"{"bad": {}}"#)
    );
}
