//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the single-device session heartbeat.

use serde::{Deserialize, Serialize};
use study_tracker_core::{DeviceSession, DeviceType};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts the heartbeat. This must be the first message sent on the connection.
    ///
    /// The device type is taken from `device_type` when given, otherwise inferred from
    /// `viewport_width`. A device that remembers an earlier session sends its
    /// `device_id` and `token` to resume it.
    Init {
        #[serde(default)]
        device_type: Option<String>,
        #[serde(default)]
        viewport_width: Option<u32>,
        #[serde(default)]
        device_id: Option<String>,
        #[serde(default)]
        token: Option<String>,
    },
    /// The user logged out on this device.
    Logout,
}

impl ClientMessage {
    /// Resolves the device type of an `Init` message. Unknown or missing values
    /// default to `Web`.
    pub fn device_type(&self) -> DeviceType {
        match self {
            ClientMessage::Init {
                device_type,
                viewport_width,
                ..
            } => device_type
                .as_deref()
                .and_then(DeviceType::parse)
                .or_else(|| viewport_width.map(DeviceType::from_viewport_width))
                .unwrap_or(DeviceType::Web),
            ClientMessage::Logout => DeviceType::Web,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms that this device now holds the session. The client stores the id and
    /// token to resume after a reload.
    SessionStarted {
        device_id: String,
        device_type: String,
        token: String,
    },
    /// Sent after every successful heartbeat.
    HeartbeatAck { last_active: String },
    /// Another device took over the account. A `ForcedLogout` follows after the delay.
    SessionConflict {
        message: String,
        logout_in_secs: u64,
    },
    /// The client must clear its login state and navigate to the login screen.
    ForcedLogout,
    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}

impl ServerMessage {
    pub fn session_started(session: &DeviceSession) -> Self {
        ServerMessage::SessionStarted {
            device_id: session.device_id.clone(),
            device_type: session.device_type.as_str().to_string(),
            token: session.token.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
