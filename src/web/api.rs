//! JSON API. Every response uses the `{success, data | error}` envelope.

use std::net::Ipv4Addr;

use actix_web::web::{Data, Json};
use actix_web::{HttpResponse, Responder, get, post};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use crate::error::{HandshakeError, ScanError};
use crate::scanner::Credentials;
use crate::scanner::manager::ScanStatus;

const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "admin";

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    ip: Option<String>,
    device_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoConnectRequest {
    ip: Option<String>,
    device_type: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    scan: ScanStatus,
    version: &'static str,
    started_at: i64,
    uptime_secs: i64,
}

/// Parse the request IP, or the 400 response to send back
fn parse_ip(raw: Option<&str>) -> Result<Ipv4Addr, HttpResponse> {
    let raw = raw.map(str::trim).filter(|ip| !ip.is_empty()).ok_or_else(|| {
        HttpResponse::BadRequest().json(ApiResponse::failure("IP not provided"))
    })?;
    raw.parse::<Ipv4Addr>().map_err(|_| {
        HttpResponse::BadRequest().json(ApiResponse::failure(
            HandshakeError::InvalidAddress(raw.to_string()).to_string(),
        ))
    })
}

fn device_type(raw: Option<&str>) -> &str {
    raw.map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("unknown")
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[post("/api/scan")]
pub async fn scan(state: Data<AppState>) -> impl Responder {
    match state.manager.scan().await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::ok(result)),
        Err(ScanError::Superseded) => {
            HttpResponse::Conflict().json(ApiResponse::failure(ScanError::Superseded.to_string()))
        }
        Err(e) => {
            warn!(error = %e, "Scan request failed");
            HttpResponse::InternalServerError().json(ApiResponse::failure(e.to_string()))
        }
    }
}

#[post("/api/handshake")]
pub async fn handshake(state: Data<AppState>, body: Json<HandshakeRequest>) -> impl Responder {
    let ip = match parse_ip(body.ip.as_deref()) {
        Ok(ip) => ip,
        Err(response) => return response,
    };

    match state
        .manager
        .handshake(ip, device_type(body.device_type.as_deref()))
        .await
    {
        Ok(report) => HttpResponse::Ok().json(ApiResponse::ok(report)),
        Err(e) => HttpResponse::Ok().json(ApiResponse::failure(e.to_string())),
    }
}

#[get("/api/handshake-history")]
pub async fn handshake_history(state: Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::ok(state.manager.handshake_history().await))
}

#[post("/api/auto-connect")]
pub async fn auto_connect(state: Data<AppState>, body: Json<AutoConnectRequest>) -> impl Responder {
    let ip = match parse_ip(body.ip.as_deref()) {
        Ok(ip) => ip,
        Err(response) => return response,
    };
    let body = body.into_inner();
    let credentials = Credentials::new(
        or_default(body.username, DEFAULT_USERNAME),
        or_default(body.password, DEFAULT_PASSWORD),
    );

    match state
        .manager
        .auto_connect(ip, device_type(body.device_type.as_deref()), &credentials)
        .await
    {
        Ok(attempt) => HttpResponse::Ok().json(ApiResponse::ok(attempt)),
        Err(e) => HttpResponse::Ok().json(ApiResponse::failure(e.to_string())),
    }
}

#[get("/api/status")]
pub async fn status(state: Data<AppState>) -> impl Responder {
    let now = chrono::Utc::now();
    HttpResponse::Ok().json(ApiResponse::ok(StatusResponse {
        scan: state.manager.status().await,
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at.timestamp(),
        uptime_secs: (now - state.started_at).num_seconds(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::network::platform::NeighborState;
    use crate::scanner::manager::ScanManager;
    use crate::test_utils::{MockProbe, StaticPlatform};
    use crate::web::configure;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn state(platform: StaticPlatform, probe: MockProbe) -> Data<AppState> {
        let manager = ScanManager::new(EngineConfig::default(), Arc::new(platform), Arc::new(probe));
        Data::new(AppState::new(Arc::new(manager)))
    }

    fn home() -> StaticPlatform {
        StaticPlatform::new(Ipv4Addr::new(192, 168, 1, 50))
            .with_gateway(Ipv4Addr::new(192, 168, 1, 1))
            .with_neighbor(
                Ipv4Addr::new(192, 168, 1, 77),
                "00:14:a8:11:22:33",
                NeighborState::Complete,
            )
    }

    #[actix_web::test]
    async fn test_scan_route() {
        let app = test::init_service(
            App::new()
                .app_data(state(home(), MockProbe::reachable()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/scan").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["summary"]["total_devices"], 3);
        assert_eq!(body["data"]["devices"][0]["device_type"], "Computer");
        assert_eq!(body["data"]["devices"][1]["device_type"], "Router/Gateway");
    }

    #[actix_web::test]
    async fn test_scan_resolution_failure_is_500() {
        let app = test::init_service(
            App::new()
                .app_data(state(StaticPlatform::unresolvable(), MockProbe::reachable()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/scan").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_handshake_requires_ip() {
        let app = test::init_service(
            App::new()
                .app_data(state(home(), MockProbe::reachable()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/handshake")
            .set_json(json!({ "deviceType": "Router/Gateway" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/handshake")
            .set_json(json!({ "ip": "999.1.1.1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_handshake_then_history() {
        let app = test::init_service(
            App::new()
                .app_data(state(home(), MockProbe::reachable().with_open_port(22)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/handshake")
            .set_json(json!({ "ip": "192.168.1.1", "deviceType": "Router/Gateway" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["access"]["method"], "ssh");
        assert_eq!(body["data"]["ports"]["ssh"], true);

        let req = test::TestRequest::get()
            .uri("/api/handshake-history")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["data"][0]["ip"], "192.168.1.1");
    }

    #[actix_web::test]
    async fn test_unreachable_is_reported_not_errored() {
        let app = test::init_service(
            App::new()
                .app_data(state(home(), MockProbe::unreachable()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auto-connect")
            .set_json(json!({ "ip": "192.168.1.77" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Device 192.168.1.77 is not responding");
    }

    #[actix_web::test]
    async fn test_auto_connect_defaults_credentials() {
        let probe = MockProbe::reachable()
            .with_http_status(crate::scanner::Service::Http, 401)
            .with_auth_status(crate::scanner::Service::Http, 200);
        let app = test::init_service(
            App::new()
                .app_data(state(home(), probe))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auto-connect")
            .set_json(json!({ "ip": "192.168.1.1", "deviceType": "Router/Gateway" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "authenticated");
        assert_eq!(body["data"]["url"], "http://192.168.1.1");
    }

    #[actix_web::test]
    async fn test_status_route() {
        let app = test::init_service(
            App::new()
                .app_data(state(home(), MockProbe::reachable()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["running"], false);
        assert_eq!(body["data"]["phase"], "idle");
        assert!(body["data"]["uptime_secs"].as_i64().is_some());
    }
}
