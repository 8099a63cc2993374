//! HTTP server assembly: router, middleware, and graceful shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::OriginAllowList;
use crate::ws::handler::ws_handler;

/// Builds the full application: REST API, `/ws`, tracing and CORS.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    let router = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the application on `listener` until `signal` resolves.
///
/// On shutdown every simulator is stopped and the hub is told to close
/// all connections. Once in-flight HTTP requests are drained, waits up to
/// `shutdown_timeout` for every WebSocket connection to write its close
/// frame and finish.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    signal: F,
    shutdown_timeout: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = state.hub.clone();
    let simulator = Arc::clone(&state.simulator);
    let connections = state.connections.clone();
    let app = build_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("shutdown requested");
            simulator.stop_all().await;
            hub.shutdown().await;
        })
        .await?;

    connections.close();
    if tokio::time::timeout(shutdown_timeout, connections.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            open = connections.len(),
            "websocket connections still open after shutdown timeout"
        );
    }
    Ok(())
}

fn cors_layer(origins: &OriginAllowList) -> CorsLayer {
    let allow_origin = if origins.allows_any() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .origins()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures_util::StreamExt;
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_util::task::TaskTracker;

    use super::*;
    use crate::hub::{Hub, HubSettings};
    use crate::service::MetricsSimulator;
    use crate::ws::ConnectionSettings;

    struct TestServer {
        addr: SocketAddr,
        hub: Hub,
        connections: TaskTracker,
        stop: oneshot::Sender<()>,
        server: JoinHandle<std::io::Result<()>>,
        dispatcher: JoinHandle<()>,
    }

    async fn start() -> TestServer {
        let (hub, dispatcher) = Hub::spawn(HubSettings::default());
        let state = AppState {
            hub: hub.clone(),
            simulator: Arc::new(MetricsSimulator::new(
                hub.clone(),
                Duration::from_millis(20),
            )),
            connection_settings: ConnectionSettings::default(),
            allowed_origins: Arc::new(OriginAllowList::from_csv("http://localhost:3000")),
            connections: TaskTracker::new(),
        };
        let connections = state.connections.clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            state,
            async move {
                let _ = stopped.await;
            },
            Duration::from_secs(5),
        ));
        TestServer {
            addr,
            hub,
            connections,
            stop,
            server,
            dispatcher,
        }
    }

    async fn wait_for_count(hub: &Hub, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while hub.connection_count().await != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection count never reached");
    }

    async fn next_json<S>(client: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("no frame arrived")
                .expect("stream ended")
                .expect("read failed");
            if let tungstenite::Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn published_event_reaches_every_viewer() {
        let server = start().await;
        let url = format!("ws://{}/ws", server.addr);
        let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        wait_for_count(&server.hub, 2).await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/api/v1/events", server.addr))
            .json(&json!({"type": "Metrics", "payload": {"cpu": 42}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 202);

        let expected = json!({"type": "Metrics", "payload": {"cpu": 42}});
        assert_eq!(next_json(&mut first).await, expected);
        assert_eq!(next_json(&mut second).await, expected);

        let _ = server.stop.send(());
        server.server.await.unwrap().unwrap();
        server.dispatcher.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_event_type_is_rejected() {
        let server = start().await;
        let response = reqwest::Client::new()
            .post(format!("http://{}/api/v1/events", server.addr))
            .json(&json!({"type": "Bogus", "payload": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], 1001);

        let _ = server.stop.send(());
        server.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn disallowed_origin_is_forbidden() {
        let server = start().await;
        let mut request = format!("ws://{}/ws", server.addr)
            .into_client_request()
            .unwrap();
        request.headers_mut().insert(
            "Origin",
            tungstenite::http::HeaderValue::from_static("http://malicious.com"),
        );
        let result = tokio_tungstenite::connect_async(request).await;
        let Err(tungstenite::Error::Http(response)) = result else {
            panic!("expected HTTP error, got {result:?}");
        };
        assert_eq!(response.status().as_u16(), 403);
        assert_eq!(server.hub.connection_count().await, 0);

        let _ = server.stop.send(());
        server.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn allowed_origin_connects() {
        let server = start().await;
        let mut request = format!("ws://{}/ws", server.addr)
            .into_client_request()
            .unwrap();
        request.headers_mut().insert(
            "Origin",
            tungstenite::http::HeaderValue::from_static("http://localhost:3000"),
        );
        let (_client, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        wait_for_count(&server.hub, 1).await;

        let _ = server.stop.send(());
        server.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn health_reports_connection_count() {
        let server = start().await;
        let (_client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();
        wait_for_count(&server.hub, 1).await;

        let body: Value = reqwest::get(format!("http://{}/health", server.addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 1);

        let listing: Value = reqwest::get(format!("http://{}/api/v1/connections", server.addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listing["count"], 1);
        let ids = listing["ids"].as_array().unwrap();
        assert_eq!(ids.len(), 1);
        let id: uuid::Uuid = ids.first().and_then(Value::as_str).unwrap().parse().unwrap();
        assert_eq!(id.get_version_num(), 4);

        let _ = server.stop.send(());
        server.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn simulator_lifecycle_over_http() {
        let server = start().await;
        let (mut viewer, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();
        wait_for_count(&server.hub, 1).await;
        let client = reqwest::Client::new();
        let base = format!("http://{}/api/v1/simulators", server.addr);

        let started = client.post(format!("{base}/api")).send().await.unwrap();
        assert_eq!(started.status().as_u16(), 202);

        let frame = next_json(&mut viewer).await;
        assert_eq!(frame["type"], "Metrics");
        assert_eq!(frame["payload"]["service_id"], "api");

        let listed: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
        assert_eq!(listed["services"], json!(["api"]));

        let stopped = client.delete(format!("{base}/api")).send().await.unwrap();
        assert_eq!(stopped.status().as_u16(), 204);
        let missing = client.delete(format!("{base}/api")).send().await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        let _ = server.stop.send(());
        server.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_closes_viewers() {
        let server = start().await;
        let (mut viewer, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();
        wait_for_count(&server.hub, 1).await;

        let _ = server.stop.send(());
        let frame = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match viewer.next().await {
                    Some(Ok(tungstenite::Message::Close(frame))) => return frame,
                    Some(Ok(_)) => {}
                    other => panic!("connection ended without a close frame: {other:?}"),
                }
            }
        })
        .await
        .expect("no close frame before timeout");
        let frame = frame.expect("close frame carries no code");
        assert_eq!(
            frame.code,
            tungstenite::protocol::frame::coding::CloseCode::Normal
        );

        server.server.await.unwrap().unwrap();
        assert!(server.connections.is_empty());
        assert_eq!(server.hub.connection_count().await, 0);
    }
}
