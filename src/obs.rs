use crate::config::schema::ObsConfig;
use crate::error::{DeckError, Result};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tungstenite::{Message, WebSocket};

/// Socket timeout used for the connect/handshake probe and for every
/// request/response exchange afterwards.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(3);

/// obs-websocket 5.x op codes.
mod op {
    pub const HELLO: u32 = 0;
    pub const IDENTIFY: u32 = 1;
    pub const IDENTIFIED: u32 = 2;
    pub const REQUEST: u32 = 6;
    pub const REQUEST_RESPONSE: u32 = 7;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    op: u32,
    d: Value,
}

#[derive(Debug, Deserialize)]
struct Hello {
    authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
struct AuthChallenge {
    challenge: String,
    salt: String,
}

#[derive(Debug, Deserialize)]
struct RequestStatus {
    result: bool,
    code: u32,
    #[serde(default)]
    comment: Option<String>,
}

/// Client for one authenticated obs-websocket 5.x connection.
///
/// Blocking by design; callers in async context go through `spawn_blocking`.
/// The socket mutex serializes request/response exchanges.
pub struct ObsClient {
    socket: Mutex<WebSocket<TcpStream>>,
    request_id: AtomicU32,
}

impl ObsClient {
    /// Connect and identify. Fails within `SOCKET_TIMEOUT`; there is no retry.
    pub fn connect(config: &ObsConfig) -> Result<Self> {
        let endpoint = format!("{}:{}", config.host, config.port);
        let addr = endpoint
            .to_socket_addrs()
            .map_err(|e| DeckError::Obs(format!("resolve {endpoint}: {e}")))?
            .next()
            .ok_or_else(|| DeckError::Obs(format!("no address for {endpoint}")))?;

        let stream = TcpStream::connect_timeout(&addr, SOCKET_TIMEOUT)
            .map_err(|e| DeckError::Obs(format!("connect {endpoint}: {e}")))?;
        stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
        stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;

        let url = format!("ws://{endpoint}");
        let (mut socket, _response) = tungstenite::client(url.as_str(), stream)
            .map_err(|e| DeckError::Obs(format!("websocket handshake: {e}")))?;

        identify(&mut socket, &config.password)?;

        Ok(Self {
            socket: Mutex::new(socket),
            request_id: AtomicU32::new(1),
        })
    }

    /// Connectivity probe: the remote application's version string.
    pub fn get_version(&self) -> Result<String> {
        let response = self.request("GetVersion", None)?;
        response
            .get("responseData")
            .and_then(|d| d.get("obsVersion"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DeckError::Obs("GetVersion response missing obsVersion".into()))
    }

    /// Fire a named hotkey. Callers treat this as fire-and-forget and only
    /// log the outcome.
    pub fn trigger_hotkey(&self, name: &str) -> Result<()> {
        self.request("TriggerHotkeyByName", Some(json!({ "hotkeyName": name })))
            .map(|_| ())
    }

    fn request(&self, request_type: &str, request_data: Option<Value>) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst).to_string();
        let mut d = json!({ "requestType": request_type, "requestId": id });
        if let Some(data) = request_data {
            d["requestData"] = data;
        }

        let mut socket = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        send_envelope(&mut socket, op::REQUEST, d)?;

        loop {
            let envelope = read_envelope(&mut socket)?;
            if envelope.op != op::REQUEST_RESPONSE {
                continue;
            }
            if envelope.d.get("requestId").and_then(Value::as_str) != Some(id.as_str()) {
                continue;
            }
            check_status(&envelope.d)?;
            return Ok(envelope.d);
        }
    }
}

fn identify(socket: &mut WebSocket<TcpStream>, password: &str) -> Result<()> {
    let hello = read_envelope(socket)?;
    if hello.op != op::HELLO {
        return Err(DeckError::Obs(format!("expected Hello, got op {}", hello.op)));
    }
    let hello: Hello = serde_json::from_value(hello.d)
        .map_err(|e| DeckError::Obs(format!("bad Hello payload: {e}")))?;

    // Events are never consumed, so subscribe to none of them.
    let mut d = json!({ "rpcVersion": 1, "eventSubscriptions": 0 });
    if let Some(auth) = hello.authentication {
        if password.is_empty() {
            return Err(DeckError::Obs(
                "OBS requires authentication but no password is configured".into(),
            ));
        }
        d["authentication"] = Value::String(auth_token(password, &auth.challenge, &auth.salt));
    }
    send_envelope(socket, op::IDENTIFY, d)?;

    let identified = read_envelope(socket)?;
    if identified.op != op::IDENTIFIED {
        return Err(DeckError::Obs(format!(
            "authentication failed (op {})",
            identified.op
        )));
    }
    Ok(())
}

fn send_envelope(socket: &mut WebSocket<TcpStream>, op: u32, d: Value) -> Result<()> {
    let envelope = json!({ "op": op, "d": d });
    socket
        .send(Message::Text(envelope.to_string()))
        .map_err(|e| DeckError::Obs(format!("send: {e}")))
}

fn read_envelope(socket: &mut WebSocket<TcpStream>) -> Result<Envelope> {
    loop {
        let msg = socket
            .read()
            .map_err(|e| DeckError::Obs(format!("read: {e}")))?;
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text)
                    .map_err(|e| DeckError::Obs(format!("bad envelope: {e}")))
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => return Err(DeckError::Obs(format!("unexpected frame: {other:?}"))),
        }
    }
}

fn check_status(response: &Value) -> Result<()> {
    let Some(status) = response.get("requestStatus") else {
        return Ok(());
    };
    let status: RequestStatus = serde_json::from_value(status.clone())
        .map_err(|e| DeckError::Obs(format!("bad request status: {e}")))?;

    if status.result {
        Ok(())
    } else {
        let msg = status
            .comment
            .unwrap_or_else(|| format!("error code {}", status.code));
        Err(DeckError::Obs(format!("request failed: {msg}")))
    }
}

/// Challenge-response token per the obs-websocket protocol:
/// base64(sha256(base64(sha256(password + salt)) + challenge)).
fn auth_token(password: &str, challenge: &str, salt: &str) -> String {
    let b64 = base64::engine::general_purpose::STANDARD;

    let secret = Sha256::digest(format!("{password}{salt}").as_bytes());
    let secret_b64 = b64.encode(secret);

    let token = Sha256::digest(format!("{secret_b64}{challenge}").as_bytes());
    b64.encode(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_token_is_deterministic() {
        let a = auth_token("hunter2", "challenge", "salt");
        let b = auth_token("hunter2", "challenge", "salt");
        assert_eq!(a, b);
        // base64 of a sha256 digest is always 44 chars.
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn auth_token_varies_with_every_input() {
        let base = auth_token("pw", "challenge", "salt");
        assert_ne!(auth_token("pw2", "challenge", "salt"), base);
        assert_ne!(auth_token("pw", "challenge2", "salt"), base);
        assert_ne!(auth_token("pw", "challenge", "salt2"), base);
    }

    #[test]
    fn missing_request_status_passes() {
        assert!(check_status(&json!({ "responseData": {} })).is_ok());
    }

    #[test]
    fn failed_request_status_surfaces_comment() {
        let response = json!({
            "requestStatus": { "result": false, "code": 604, "comment": "no such hotkey" }
        });
        let err = check_status(&response).unwrap_err();
        assert!(err.to_string().contains("no such hotkey"));
    }

    #[test]
    fn successful_request_status_passes() {
        let response = json!({
            "requestStatus": { "result": true, "code": 100 }
        });
        assert!(check_status(&response).is_ok());
    }
}
