//! Wire envelopes exchanged with browser observers.
//!
//! Inbound control frames are `{"type": ..., "data": ...}` objects.
//! [`ObserverFrame::decode`] maps the tag onto an enum once, at the
//! boundary, with an explicit [`ObserverFrame::Unknown`] arm so callers
//! never dispatch on raw strings.
//!
//! Robot traffic carries no envelope: robot frames are forwarded to
//! observers byte for byte, and `robot_command` frames are forwarded to
//! robots as the observer sent them.

use serde::Serialize;
use serde_json::Value;

const CHAT_TAG: &str = "chat";
const SPEECH_TAG: &str = "tts";
const ROBOT_COMMAND_TAG: &str = "robot_command";

/// A decoded observer control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverFrame {
    /// Text prompt for the chat responder.
    Chat(String),
    /// Text to synthesize into audio.
    Speech(String),
    /// Forward the frame verbatim to every connected robot.
    RobotCommand,
    /// A well-formed envelope with a tag the hub does not handle.
    Unknown(String),
}

/// Why an observer frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame is not a JSON object of the expected shape.
    #[error("frame is not a valid envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope has no string `type` field.
    #[error("envelope is missing a string `type` field")]
    MissingType,

    /// A `chat` or `tts` envelope without a string `data` field.
    #[error("`{kind}` envelope requires a string `data` field")]
    MissingText {
        /// The envelope tag that was being decoded.
        kind: &'static str,
    },
}

/// Envelope fields, read from a JSON object. Arrays and scalars are
/// rejected by the map deserializer.
type Envelope = serde_json::Map<String, Value>;

impl ObserverFrame {
    /// Decode a raw observer frame.
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let mut envelope: Envelope = serde_json::from_slice(frame)?;
        let kind = match envelope.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(FrameError::MissingType),
        };
        let data = envelope.remove("data").unwrap_or(Value::Null);

        match kind.as_str() {
            CHAT_TAG => text_data(data, CHAT_TAG).map(Self::Chat),
            SPEECH_TAG => text_data(data, SPEECH_TAG).map(Self::Speech),
            ROBOT_COMMAND_TAG => Ok(Self::RobotCommand),
            _ => Ok(Self::Unknown(kind)),
        }
    }

    /// Short label for logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Chat(_) => CHAT_TAG,
            Self::Speech(_) => SPEECH_TAG,
            Self::RobotCommand => ROBOT_COMMAND_TAG,
            Self::Unknown(_) => "unknown",
        }
    }
}

fn text_data(data: Value, kind: &'static str) -> Result<String, FrameError> {
    match data {
        Value::String(text) => Ok(text),
        _ => Err(FrameError::MissingText { kind }),
    }
}

/// A structured reply written back to the observer that asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ObserverReply {
    /// `{"type": "chat_response", "data": "<text>"}`
    ChatResponse(String),
    /// `{"type": "tts_response", "data": {"audioPath": "<path>"}}`
    TtsResponse {
        /// Opaque audio reference produced by the synthesizer.
        #[serde(rename = "audioPath")]
        audio_path: String,
    },
}
