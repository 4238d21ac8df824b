//! API Routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use super::ptz_routes::{ptz_home, ptz_move, ptz_stop, ptz_zoom, reboot};
use super::stream_routes::{list_cameras, list_streams, start_stream, stop_stream, stream_status};
use crate::state::AppState;

/// Create API router.
///
/// Anything not matched by an API route is served from the HLS output root.
pub fn create_router(state: AppState) -> Router {
    let hls = Router::new()
        .fallback_service(ServeDir::new(&state.config.hls_dir))
        .layer(middleware::from_fn(super::hls_headers));

    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Cameras & streams
        .route("/api/cameras", get(list_cameras))
        .route("/api/streams", get(list_streams))
        .route("/api/cameras/:id/stream", get(stream_status))
        .route("/api/cameras/:id/stream/start", post(start_stream))
        .route("/api/cameras/:id/stream/stop", post(stop_stream))
        // Camera control
        .route("/api/cameras/:id/ptz/move", post(ptz_move))
        .route("/api/cameras/:id/ptz/stop", post(ptz_stop))
        .route("/api/cameras/:id/ptz/home", post(ptz_home))
        .route("/api/cameras/:id/ptz/zoom", post(ptz_zoom))
        .route("/api/cameras/:id/reboot", post(reboot))
        .with_state(state)
        .merge(hls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::{Camera, CameraDirectory};
    use crate::digest_auth::{Credentials, DigestAuthClient};
    use crate::ptz_controller::PtzService;
    use crate::state::AppConfig;
    use crate::stream_session::{
        ProcessControl, ProcessHandle, StreamSessionManager, TranscodeJob, TranscodeLauncher,
    };
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Launcher whose processes run until the test ends
    #[derive(Default)]
    struct IdleLauncher {
        controls: Mutex<Vec<ProcessControl>>,
    }

    impl TranscodeLauncher for IdleLauncher {
        fn launch(&self, _job: &TranscodeJob) -> std::io::Result<ProcessHandle> {
            let (handle, control) = ProcessHandle::channel(Some(4242));
            self.controls.lock().push(control);
            Ok(handle)
        }
    }

    fn camera(id: &str, control_url: Option<String>) -> Camera {
        Camera {
            camera_id: id.to_string(),
            name: format!("Camera {}", id),
            url: "rtsp://10.0.0.5/stream1".to_string(),
            group: Some("1F".to_string()),
            control_url,
            username: Some("root".to_string()),
            password: Some("secret".to_string()),
            rotation: 0,
            ptz: true,
        }
    }

    fn test_state(hls_dir: &std::path::Path, control_url: Option<String>) -> AppState {
        let config = AppConfig {
            hls_dir: hls_dir.to_path_buf(),
            ..AppConfig::default()
        };
        let cameras = Arc::new(
            CameraDirectory::from_cameras([camera("lobby", None), camera("dome", control_url)])
                .unwrap(),
        );

        let streams = Arc::new(StreamSessionManager::new(
            cameras.clone(),
            Arc::new(IdleLauncher::default()),
            config.hls_dir.clone(),
            Duration::from_millis(100),
        ));
        let ptz = Arc::new(PtzService::new(
            cameras.clone(),
            DigestAuthClient::new(Duration::from_secs(5)).unwrap(),
            Credentials::default(),
        ));

        AppState {
            config,
            cameras,
            streams,
            ptz,
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), None));

        let (status, body) = send_json(&app, Method::GET, "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cameras"], 2);
        assert_eq!(body["active_streams"], 0);
    }

    #[tokio::test]
    async fn test_camera_list_hides_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), Some("http://10.0.0.9".to_string())));

        let (status, bytes) = send(&app, Method::GET, "/api/cameras", None).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("secret"));
        assert!(!text.contains("rtsp://"));

        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body[0]["camera_id"], "dome");
        assert_eq!(body[0]["ptz"], true);
        assert_eq!(body[1]["camera_id"], "lobby");
        assert_eq!(body[1]["controllable"], false);
    }

    #[tokio::test]
    async fn test_stream_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), None));

        let (status, body) =
            send_json(&app, Method::POST, "/api/cameras/lobby/stream/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "started");
        assert_eq!(body["hls_url"], "/lobby/stream.m3u8");
        assert!(dir.path().join("lobby").is_dir());

        let (_, body) =
            send_json(&app, Method::POST, "/api/cameras/lobby/stream/start", None).await;
        assert_eq!(body["status"], "already_running");
        assert_eq!(body["hls_url"], "/lobby/stream.m3u8");

        let (_, body) = send_json(&app, Method::GET, "/api/cameras/lobby/stream", None).await;
        assert_eq!(body["active"], true);
        assert_eq!(body["state"], "running");

        let (_, body) = send_json(&app, Method::GET, "/api/streams", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["pid"], 4242);

        let (status, body) =
            send_json(&app, Method::POST, "/api/cameras/lobby/stream/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "stopped");

        let (_, body) = send_json(&app, Method::GET, "/api/cameras/lobby/stream", None).await;
        assert_eq!(body["active"], false);
        assert_eq!(body["hls_url"], Value::Null);

        let (status, body) =
            send_json(&app, Method::POST, "/api/cameras/lobby/stream/stop", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "NOT_ACTIVE");
    }

    #[tokio::test]
    async fn test_start_unknown_camera() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), None));

        let (status, body) =
            send_json(&app, Method::POST, "/api/cameras/garage/stream/start", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "NOT_FOUND");
        assert!(!dir.path().join("garage").exists());
    }

    #[tokio::test]
    async fn test_serves_hls_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lobby")).unwrap();
        std::fs::write(dir.path().join("lobby/stream.m3u8"), "#EXTM3U\n").unwrap();
        std::fs::write(dir.path().join("lobby/segment_00000.ts"), [0x47u8; 188]).unwrap();
        let app = create_router(test_state(dir.path(), None));

        let response = app
            .clone()
            .oneshot(Request::get("/lobby/stream.m3u8").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.apple.mpegurl"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let response = app
            .clone()
            .oneshot(Request::get("/lobby/segment_00000.ts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp2t");

        let (status, _) = send(&app, Method::GET, "/lobby/missing.m3u8", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ptz_requires_control_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), None));

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/cameras/lobby/ptz/move",
            Some(serde_json::json!({ "direction": "up" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_ptz_move_and_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/axis-cgi/com/ptz.cgi"))
            .and(query_param("move", "up"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/axis-cgi/restart.cgi"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), Some(server.uri())));

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/cameras/dome/ptz/move",
            Some(serde_json::json!({ "direction": "up" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (status, body) = send_json(&app, Method::POST, "/api/cameras/dome/reboot", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error_code"], "UPSTREAM_STATUS");
    }
}
