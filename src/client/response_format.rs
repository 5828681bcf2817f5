#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                  Traits
// ***************************************************************************
/** Produce the display string from a successful greeting response body.
 * Each handler instance owns exactly one strategy, chosen at start up.
 */
pub trait ResponseFormat: Send + Sync {
    fn kind(&self) -> ResponseFormatKind;
    fn render(&self, body: &str) -> Result<String, Errors>;
}

// ***************************************************************************
//                             Format Selection
// ***************************************************************************
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormatKind {
    #[default]
    Json,
    Text,
}

impl ResponseFormatKind {
    pub fn strategy(self) -> Box<dyn ResponseFormat> {
        match self {
            ResponseFormatKind::Json => Box::new(JsonGreeting),
            ResponseFormatKind::Text => Box::new(TextGreeting),
        }
    }
}

impl FromStr for ResponseFormatKind {
    type Err = Errors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseFormatKind::Json),
            "text" => Ok(ResponseFormatKind::Text),
            _ => Err(Errors::UnknownResponseFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ResponseFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormatKind::Json => write!(f, "json"),
            ResponseFormatKind::Text => write!(f, "text"),
        }
    }
}

// ***************************************************************************
//                                 Variants
// ***************************************************************************
// ---------------------------------------------------------------------------
// JsonGreeting:
// ---------------------------------------------------------------------------
/// Structured replies: `{"name": "Ana", ...}` becomes `Hola, Ana!`.
pub struct JsonGreeting;

// Only the name is used; the server also sends a "mensaje" field.
#[derive(Debug, Deserialize)]
struct GreetingRecord {
    name: String,
}

impl ResponseFormat for JsonGreeting {
    fn kind(&self) -> ResponseFormatKind {
        ResponseFormatKind::Json
    }

    fn render(&self, body: &str) -> Result<String, Errors> {
        let record: GreetingRecord = serde_json::from_str(body)
            .map_err(|e| Errors::ResponseParse(e.to_string()))?;
        Ok(format!("Hola, {}!", record.name))
    }
}

// ---------------------------------------------------------------------------
// TextGreeting:
// ---------------------------------------------------------------------------
/// Plain text replies are displayed exactly as received.
pub struct TextGreeting;

impl ResponseFormat for TextGreeting {
    fn kind(&self) -> ResponseFormatKind {
        ResponseFormatKind::Text
    }

    fn render(&self, body: &str) -> Result<String, Errors> {
        Ok(body.to_string())
    }
}
