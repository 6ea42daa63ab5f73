use futures::StreamExt;
use mockito::Matcher;
use parley_llm::{
    ChatClient, ChatMessage, ChatRequest, ChatSettings, DeltaEvent, ServerConfig, SseChatClient,
    StreamError,
};
use serde_json::json;

fn request() -> ChatRequest {
    ChatRequest::new(
        ChatSettings::new("gpt-4o"),
        vec![ChatMessage::user("hello")],
    )
}

fn client(base_url: String) -> SseChatClient {
    SseChatClient::new(ServerConfig::new("test-token").with_base_url(base_url)).unwrap()
}

#[tokio::test]
async fn test_streams_deltas_until_done() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"total_tokens\":9}}\n\n",
        "data: [DONE]\n\n",
    );
    let mock = server
        .mock("POST", "/chat/send")
        .match_header("authorization", "Bearer test-token")
        .match_header("accept", "text/event-stream")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "stream": true,
            "messages": [{"role": "user", "content": "hello"}],
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let events: Vec<_> = client(server.url()).chat_stream(request()).collect().await;
    let events: Vec<DeltaEvent> = events.into_iter().map(Result::unwrap).collect();

    assert_eq!(
        events,
        vec![
            DeltaEvent::text("Hel"),
            DeltaEvent::text("lo"),
            DeltaEvent::finish(),
        ]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_is_single_transport_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/send")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let events: Vec<_> = client(server.url()).chat_stream(request()).collect().await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        Err(StreamError::Transport { status, message }) => {
            assert_eq!(*status, Some(401));
            assert_eq!(message, "unauthorized");
        }
        other => panic!("Expected Transport error, got {:?}", other),
    }
    assert!(events[0].as_ref().unwrap_err().is_auth());
}

#[tokio::test]
async fn test_plain_text_auth_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/send")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: FAILED_TO_AUTH: token expired\n\n")
        .create_async()
        .await;

    let events: Vec<_> = client(server.url()).chat_stream(request()).collect().await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Err(StreamError::Auth { reason }) if reason == "FAILED_TO_AUTH: token expired"));
}

#[tokio::test]
async fn test_abort_yields_no_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/send")
        .with_status(200)
        .with_body("data: [DONE]\n\n")
        .create_async()
        .await;

    let (events, handle) = client(server.url()).chat_stream_abortable(request());
    handle.abort();
    let events: Vec<_> = events.collect().await;

    assert!(events.is_empty());
}

#[tokio::test]
async fn test_abort_mid_stream_stops_without_error() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"three\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let _mock = server
        .mock("POST", "/chat/send")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let (mut events, handle) = client(server.url()).chat_stream_abortable(request());

    let first = events.next().await.unwrap().unwrap();
    assert_eq!(first, DeltaEvent::text("one"));

    handle.abort();
    let rest: Vec<_> = events.collect().await;

    assert!(rest.is_empty(), "expected nothing after abort, got {:?}", rest);
}

#[tokio::test]
async fn test_connection_refused() {
    let client = SseChatClient::new(
        ServerConfig::new("t").with_base_url("http://127.0.0.1:1"),
    )
    .unwrap();

    let events: Vec<_> = client.chat_stream(request()).collect().await;

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Err(StreamError::Transport { status: None, .. })));
}
