//! HTTP API.
//!
//! A small hand-rolled HTTP/1.1 server over `TcpListener`, serving the alert
//! store, monitor status, the latest video frame, and emergency calling.
//! Handlers only read shared state (alert log, frame hub, monitor state);
//! the camera handle stays with the capture worker.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::capture::{FrameHub, MonitorState};
use crate::storage::{AlertLog, SharedAlertLog};
use crate::voice::EmergencyDialer;
use crate::{now_ms, AlertPayload};

const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Alerts returned by `GET /alerts` without a `since` filter.
const DEFAULT_ALERT_WINDOW: usize = 100;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8700".to_string(),
        }
    }
}

/// Shared state the handlers read. The frame hub and monitor state are absent
/// in the API-only service.
#[derive(Clone)]
pub struct ApiContext {
    pub alerts: SharedAlertLog,
    pub hub: Option<FrameHub>,
    pub monitor: Option<Arc<MonitorState>>,
    pub dialer: Arc<EmergencyDialer>,
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    ctx: ApiContext,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, ctx: ApiContext) -> Self {
        Self { cfg, ctx }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let ctx = self.ctx.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, ctx, shutdown_thread) {
                log::error!("alert api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(listener: TcpListener, ctx: ApiContext, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &ctx) {
                    log::warn!("alert api request failed: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, ctx: &ApiContext) -> Result<()> {
    let request = read_request(&mut stream)?;

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        ("GET", "/alerts") => get_alerts(&mut stream, &request, &ctx.alerts),
        ("POST", "/alerts") => post_alert(&mut stream, &request, &ctx.alerts),
        ("GET", "/stats") => get_stats(&mut stream, &ctx.alerts),
        ("GET", "/monitor/status") => get_monitor_status(&mut stream, ctx),
        ("GET", "/video/frame") => get_video_frame(&mut stream, ctx),
        ("GET", "/voice/status") => {
            let body = serde_json::to_string(&ctx.dialer.status())?;
            write_json_response(&mut stream, 200, &body)
        }
        ("POST", path) if path.starts_with("/voice/call/") => {
            let contact = path.trim_start_matches("/voice/call/");
            post_voice_call(&mut stream, ctx, contact)
        }
        ("GET" | "POST", _) => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
        _ => write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#),
    }
}

fn lock_alerts(alerts: &SharedAlertLog) -> Result<MutexGuard<'_, AlertLog>> {
    alerts.lock().map_err(|_| anyhow!("alert log lock poisoned"))
}

fn get_alerts(stream: &mut TcpStream, request: &HttpRequest, alerts: &SharedAlertLog) -> Result<()> {
    let data = match request.query_param("since") {
        Some(raw) => {
            let since: u64 = match raw.parse() {
                Ok(since) => since,
                Err(_) => {
                    return write_json_response(
                        stream,
                        400,
                        r#"{"error":"since_must_be_ms_epoch"}"#,
                    );
                }
            };
            lock_alerts(alerts)?.since(since)
        }
        None => lock_alerts(alerts)?.recent(DEFAULT_ALERT_WINDOW),
    };
    let body = serde_json::to_string(&serde_json::json!({ "data": data }))?;
    write_json_response(stream, 200, &body)
}

fn post_alert(stream: &mut TcpStream, request: &HttpRequest, alerts: &SharedAlertLog) -> Result<()> {
    let alert: AlertPayload = match serde_json::from_slice(&request.body) {
        Ok(alert) => alert,
        Err(err) => {
            log::warn!("rejected malformed alert: {}", err);
            return write_json_response(stream, 400, r#"{"error":"invalid_alert"}"#);
        }
    };
    lock_alerts(alerts)?.append(alert);
    write_json_response(stream, 200, r#"{"ok":true}"#)
}

fn get_stats(stream: &mut TcpStream, alerts: &SharedAlertLog) -> Result<()> {
    let stats = lock_alerts(alerts)?.stats(now_ms()?);
    let body = serde_json::to_string(&stats)?;
    write_json_response(stream, 200, &body)
}

fn get_monitor_status(stream: &mut TcpStream, ctx: &ApiContext) -> Result<()> {
    let body = match &ctx.monitor {
        Some(monitor) => serde_json::to_string(&monitor.snapshot())?,
        None => r#"{"running":false}"#.to_string(),
    };
    write_json_response(stream, 200, &body)
}

fn get_video_frame(stream: &mut TcpStream, ctx: &ApiContext) -> Result<()> {
    let latest = ctx.hub.as_ref().and_then(|hub| hub.latest());
    match latest {
        Some(frame) => write_response(stream, 200, "image/jpeg", &frame.jpeg),
        None => write_json_response(stream, 404, r#"{"error":"no_frame"}"#),
    }
}

fn post_voice_call(stream: &mut TcpStream, ctx: &ApiContext, contact: &str) -> Result<()> {
    if contact.is_empty() {
        return write_json_response(stream, 400, r#"{"error":"missing_contact"}"#);
    }
    match ctx.dialer.call_contact(contact) {
        Ok(outcome) => {
            let body = serde_json::to_string(&outcome)?;
            write_json_response(stream, 200, &body)
        }
        Err(err) => {
            log::warn!("emergency call to '{}' failed: {}", contact, err);
            let body = serde_json::to_string(&serde_json::json!({
                "error": "call_failed",
                "detail": err.to_string(),
            }))?;
            write_json_response(stream, 500, &body)
        }
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break data
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .ok_or_else(|| anyhow!("truncated request"))?;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| anyhow!("invalid content-length"))?
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Err(anyhow!("request body too large"));
    }

    let mut body: Vec<u8> = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("truncated request body"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        raw_path: raw_path.to_string(),
        body,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    raw_path: String,
    body: Vec<u8>,
}

impl HttpRequest {
    fn query_param(&self, name: &str) -> Option<String> {
        let query = self.raw_path.split('?').nth(1)?;
        for pair in query.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                if k == name {
                    return Some(v.to_string());
                }
            }
        }
        None
    }
}
