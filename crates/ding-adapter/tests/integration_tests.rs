//! Integration tests for ding-adapter.
//!
//! Outbound calls go to a local wiremock server standing in for the
//! session webhook, so no DingTalk account is needed.
//!
//!   cargo test -p ding-adapter --test integration_tests

use std::sync::Arc;
use std::time::Duration;

use ding_adapter::{
    AdapterConfig, AdapterError, ApiParams, Bot, BotRegistry, Event, MessageSegment, NetworkError,
    RawPayload, POST_WEBHOOK,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOOK_PATH: &str = "/robot/sendBySession";

fn config() -> Arc<AdapterConfig> {
    Arc::new(AdapterConfig::new("secret").with_access_token("tok"))
}

fn bot(id: &str, registry: &BotRegistry) -> Bot {
    Bot::new(id, config(), registry.clone()).unwrap()
}

fn event(webhook: &str, conversation_type: &str) -> Event {
    let value = json!({
        "chatbotUserId": "bot-1",
        "msgtype": "text",
        "text": {"content": "ping"},
        "conversationType": conversation_type,
        "conversationId": "cid-1",
        "senderId": "u1",
        "createAt": 1700000000000u64,
        "sessionWebhook": webhook
    });
    let Value::Object(raw) = value else {
        unreachable!()
    };
    Event::from_raw(raw)
}

async fn webhook_server(status: u16, body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(HOOK_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn hook_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), HOOK_PATH)
}

// ============================================================================
// API dispatcher
// ============================================================================

mod call_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_session_webhook_is_not_available() {
        let registry = BotRegistry::new();
        let result = bot("bot-1", &registry)
            .call_api(POST_WEBHOOK, ApiParams::default().with_message("hi"))
            .await;
        assert!(matches!(result, Err(AdapterError::ApiNotAvailable)));
    }

    #[tokio::test]
    async fn test_errcode_zero_returns_body() {
        let server = webhook_server(200, json!({"errcode": 0, "errmsg": "ok"})).await;
        let registry = BotRegistry::new();

        let result = bot("bot-1", &registry)
            .call_api(
                POST_WEBHOOK,
                ApiParams::webhook(hook_url(&server)).with_message("hi"),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"errcode": 0, "errmsg": "ok"}));
    }

    #[tokio::test]
    async fn test_posts_message_with_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .and(query_param("access_token", "tok"))
            .and(body_json(json!({"msgtype": "markdown", "markdown": {"title": "t", "text": "**b**"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let registry = BotRegistry::new();
        bot("bot-1", &registry)
            .call_api(
                POST_WEBHOOK,
                ApiParams::webhook(hook_url(&server))
                    .with_message(MessageSegment::markdown("t", "**b**")),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_errcode_nonzero_is_api_error() {
        let server = webhook_server(200, json!({"errcode": 1, "errmsg": "x"})).await;
        let registry = BotRegistry::new();

        let result = bot("bot-1", &registry)
            .call_api(POST_WEBHOOK, ApiParams::webhook(hook_url(&server)))
            .await;
        match result {
            Err(AdapterError::Api { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message, "x");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_500_is_network_error() {
        let server = webhook_server(500, json!({"errcode": 0})).await;
        let registry = BotRegistry::new();

        let result = bot("bot-1", &registry)
            .call_api(POST_WEBHOOK, ApiParams::webhook(hook_url(&server)))
            .await;
        assert!(matches!(
            result,
            Err(AdapterError::Network(NetworkError::UnexpectedStatus(500)))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Nothing listens on port 1.
        let url = "http://127.0.0.1:1/robot/sendBySession";

        let registry = BotRegistry::new();
        let result = bot("bot-1", &registry)
            .call_api(POST_WEBHOOK, ApiParams::webhook(url))
            .await;
        assert!(matches!(
            result,
            Err(AdapterError::Network(NetworkError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_slow_platform_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"errcode": 0}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = Arc::new(AdapterConfig::new("secret").with_api_timeout(Duration::from_millis(200)));
        let bot = Bot::new("bot-1", config, BotRegistry::new()).unwrap();

        let result = bot
            .call_api(POST_WEBHOOK, ApiParams::webhook(hook_url(&server)))
            .await;
        assert!(matches!(
            result,
            Err(AdapterError::Network(NetworkError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let registry = BotRegistry::new();
        let result = bot("bot-1", &registry)
            .call_api(POST_WEBHOOK, ApiParams::webhook(hook_url(&server)))
            .await;
        assert!(matches!(result, Err(AdapterError::Json(_))));
    }

    #[tokio::test]
    async fn test_call_is_forwarded_to_named_bot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("access_token", "tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let registry = BotRegistry::new();
        let first = bot("bot-1", &registry);
        let second = Bot::new(
            "bot-2",
            Arc::new(AdapterConfig::new("secret").with_access_token("tok-2")),
            registry.clone(),
        )
        .unwrap();
        registry.connect(first.clone()).await;
        registry.connect(second).await;

        first
            .call_api(
                POST_WEBHOOK,
                ApiParams::webhook(hook_url(&server)).with_self_id("bot-2"),
            )
            .await
            .unwrap();
    }
}

// ============================================================================
// Send orchestrator
// ============================================================================

mod send_tests {
    use super::*;

    async fn capture_body(conversation_type: &str, at_sender: bool) -> Value {
        let server = webhook_server(200, json!({"errcode": 0})).await;
        let registry = BotRegistry::new();
        let event = event(&hook_url(&server), conversation_type);

        bot("bot-1", &registry)
            .send(&event, "hi", at_sender, ApiParams::default())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn test_group_reply_mentions_sender() {
        let body = capture_body("2", true).await;
        assert_eq!(
            body,
            json!({
                "msgtype": "text",
                "text": {"content": "@u1 hi"},
                "at": {"atMobiles": ["u1"], "isAtAll": false}
            })
        );
    }

    #[tokio::test]
    async fn test_direct_reply_never_mentions() {
        let body = capture_body("1", true).await;
        assert_eq!(body, json!({"msgtype": "text", "text": {"content": "hi"}}));
    }

    #[tokio::test]
    async fn test_group_reply_without_at_sender() {
        let body = capture_body("2", false).await;
        assert_eq!(body, json!({"msgtype": "text", "text": {"content": "hi"}}));
    }

    #[tokio::test]
    async fn test_overrides_replace_session_webhook() {
        let original = webhook_server(200, json!({"errcode": 0})).await;
        let replacement = webhook_server(200, json!({"errcode": 0})).await;
        let registry = BotRegistry::new();
        let event = event(&hook_url(&original), "2");

        bot("bot-1", &registry)
            .send(
                &event,
                MessageSegment::text("moved"),
                false,
                ApiParams::default().with_session_webhook(hook_url(&replacement)),
            )
            .await
            .unwrap();

        assert!(original.received_requests().await.unwrap().is_empty());
        assert_eq!(replacement.received_requests().await.unwrap().len(), 1);
    }

    async fn capture_body_for(raw: RawPayload) -> Value {
        let server = webhook_server(200, json!({"errcode": 0})).await;
        let registry = BotRegistry::new();
        let mut raw = raw;
        raw.insert("sessionWebhook".into(), json!(hook_url(&server)));

        bot("bot-1", &registry)
            .send(&Event::from_raw(raw), "hi", true, ApiParams::default())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn test_group_reply_to_empty_sender_id_has_no_mention() {
        let mut raw = event("", "2").into_raw();
        raw.insert("senderId".into(), json!(""));

        let body = capture_body_for(raw).await;
        assert_eq!(body, json!({"msgtype": "text", "text": {"content": "hi"}}));
    }

    #[tokio::test]
    async fn test_group_reply_without_sender_id_has_no_mention() {
        let mut raw = event("", "2").into_raw();
        raw.remove("senderId");

        let body = capture_body_for(raw).await;
        assert_eq!(body, json!({"msgtype": "text", "text": {"content": "hi"}}));
    }

    #[test]
    fn test_compose_reply_segments() {
        let registry = BotRegistry::new();
        let bot = bot("bot-1", &registry);

        let group = event("http://127.0.0.1:1/", "2");
        let reply = bot.compose_reply(&group, "hi", true);
        assert_eq!(
            reply.segments(),
            &[
                MessageSegment::at("u1"),
                MessageSegment::text(" "),
                MessageSegment::text("hi"),
            ]
        );

        let direct = event("http://127.0.0.1:1/", "1");
        let reply = bot.compose_reply(&direct, "hi", true);
        assert_eq!(reply.segments(), &[MessageSegment::text("hi")]);

        let reply = bot.compose_reply(&group, "hi", false);
        assert_eq!(reply.segments(), &[MessageSegment::text("hi")]);
    }

    #[tokio::test]
    async fn test_event_without_webhook_is_not_available() {
        let registry = BotRegistry::new();
        let mut raw = RawPayload::new();
        raw.insert("chatbotUserId".into(), json!("bot-1"));
        raw.insert("conversationType".into(), json!("2"));
        let event = Event::from_raw(raw);

        let result = bot("bot-1", &registry)
            .send(&event, "hi", true, ApiParams::default())
            .await;
        assert!(matches!(result, Err(AdapterError::ApiNotAvailable)));
    }
}
