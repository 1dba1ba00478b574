//! Bot client against an in-process mock gateway.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    serde_json::{Value, json},
    tokio::net::TcpListener,
    tokio_tungstenite::{accept_async, tungstenite::Message},
};

use {
    kotori_command::{CommandSpec, spec::handler as command_handler},
    kotori_config::BotConfig,
    kotori_plugin::{Plugin, PluginContext},
    kotori_runtime::BotClient,
};

/// Serve one gateway connection: greet with a lifecycle event, push one
/// group message, then answer API requests by action name.
async fn serve_gateway(listener: TcpListener) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();

    ws.send(Message::Text(
        json!({
            "post_type": "meta_event",
            "meta_event_type": "lifecycle",
            "sub_type": "connect",
            "time": 1,
            "self_id": 123456,
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    ws.send(Message::Text(
        json!({
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "time": 2,
            "self_id": 123456,
            "message_id": 77,
            "user_id": 20002,
            "group_id": 30003,
            "raw_message": "/ping",
            "message": [{"type": "text", "data": {"text": "/ping"}}],
            "sender": {"user_id": 20002, "nickname": "alice", "role": "member"},
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Value = serde_json::from_str(&text).unwrap();
        let data = match request["action"].as_str().unwrap() {
            "get_login_info" => json!({"user_id": 123456, "nickname": "kotori"}),
            "send_group_msg" => json!({"message_id": 999}),
            other => json!({"echoed_action": other}),
        };
        ws.send(Message::Text(
            json!({
                "status": "ok",
                "retcode": 0,
                "message": "",
                "data": data,
                "echo": request["echo"],
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();
    }
}

fn test_config(uri: &str, base: &std::path::Path) -> BotConfig {
    let mut config = BotConfig::default();
    config.bt_uin = "123456".into();
    config.root = "999".into();
    config.napcat.ws_uri = uri.into();
    config.plugin.plugins_dir = base.join("plugins").to_string_lossy().into_owned();
    config.plugin.data_dir = base.join("data").to_string_lossy().into_owned();
    config
}

struct GreeterPlugin {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Plugin for GreeterPlugin {
    async fn on_load(&mut self, _ctx: &mut PluginContext) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("load".into());
        Ok(())
    }

    async fn on_close(&mut self, _ctx: &mut PluginContext) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("close".into());
        Ok(())
    }
}

#[tokio::test]
async fn full_stack_against_mock_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(serve_gateway(listener));

    let tmp = tempfile::tempdir().unwrap();
    let plugins_dir = tmp.path().join("plugins").join("greeter");
    std::fs::create_dir_all(&plugins_dir).unwrap();
    std::fs::write(
        plugins_dir.join("manifest.toml"),
        "name = \"greeter\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();

    let mut client = BotClient::new(test_config(&uri, tmp.path())).unwrap();

    let plugin_log = Arc::new(Mutex::new(Vec::new()));
    let factory_log = Arc::clone(&plugin_log);
    client.register_plugin("greeter", move || {
        Box::new(GreeterPlugin {
            log: Arc::clone(&factory_log),
        })
    });

    // A command the pushed group message will trigger.
    let pings = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&pings);
    client.commands().register(
        CommandSpec::builder("ping")
            .build(command_handler(move |call| {
                let counter = Arc::clone(&counter);
                async move {
                    assert_eq!(call.event.group_id(), Some("30003"));
                    *counter.lock().unwrap() += 1;
                    Ok(())
                }
            }))
            .unwrap(),
    );

    let api = client.start().await.unwrap();

    // Outbound request/response through the full stack.
    let info = api.get_login_info().await.unwrap();
    assert_eq!(info["user_id"], 123456);
    let message_id = api.send_group_text("30003", "hello").await.unwrap();
    assert_eq!(message_id, "999");

    // The pushed /ping message reaches the command engine.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*pings.lock().unwrap(), 1);
    assert_eq!(*plugin_log.lock().unwrap(), vec!["load"]);

    client.shutdown().await;
    assert_eq!(*plugin_log.lock().unwrap(), vec!["load", "close"]);
    assert!(tmp.path().join("data").join("rbac.json").is_file());
}

#[tokio::test]
async fn back_mode_returns_api_after_startup_event() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(serve_gateway(listener));

    let tmp = tempfile::tempdir().unwrap();
    let client = BotClient::new(test_config(&uri, tmp.path())).unwrap();

    let api = tokio::task::spawn_blocking(move || {
        client.run_back_with_timeout(Duration::from_secs(10))
    })
    .await
    .unwrap()
    .unwrap();

    let info = api.get_login_info().await.unwrap();
    assert_eq!(info["nickname"], "kotori");
}

#[tokio::test]
async fn unreachable_gateway_fails_startup() {
    let tmp = tempfile::tempdir().unwrap();
    // Nothing listens here.
    let mut client = BotClient::new(test_config("ws://127.0.0.1:1", tmp.path())).unwrap();
    assert!(client.start().await.is_err());
}
