#![forbid(unsafe_code)]

use std::sync::Arc;

use log::{debug, info};
use reqwest::{Client, Url};
use tokio::task::JoinHandle;

use crate::client::response_format::{ResponseFormat, ResponseFormatKind};
use crate::client::ui::{Alert, Diagnostics, InputField, OutputField};
use crate::utils::errors::Errors;
use crate::utils::saludo_utils::{build_greeting_url, parse_base_url};

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const EMPTY_NAME_MSG  : &str = "Por favor, ingresa un nombre";
pub const FALLBACK_MSG    : &str = "Error al obtener la respuesta.";
const DIAGNOSTIC_CONTEXT  : &str = "Error en la petición";

const USER_AGENT: &str = concat!("saludo_client/", env!("CARGO_PKG_VERSION"));

// ***************************************************************************
//                             Handler Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// HandlerSettings:
// ---------------------------------------------------------------------------
/// Where the greeting endpoint lives and how its replies are read.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub base_url: String,
    pub endpoint_path: String,
    pub response_format: ResponseFormatKind,
}

// ---------------------------------------------------------------------------
// Handles:
// ---------------------------------------------------------------------------
/// The page-lifetime collaborators, shared by every invocation.
#[derive(Clone)]
pub struct Handles {
    pub input: Arc<dyn InputField>,
    pub output: Arc<dyn OutputField>,
    pub alert: Arc<dyn Alert>,
    pub diagnostics: Arc<dyn Diagnostics>,
}

// ---------------------------------------------------------------------------
// Outcome:
// ---------------------------------------------------------------------------
/// What a single invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank name: alert raised, nothing sent, display untouched.
    Rejected,
    /// Greeting written to the display.
    Displayed(String),
    /// Fallback written to the display; carries the logged error detail.
    Failed(String),
}

// ---------------------------------------------------------------------------
// RequestHandler:
// ---------------------------------------------------------------------------
/** Responds to the user's send action.  Cloning is cheap and clones share the
 * same HTTP client and handles, so overlapping invocations race on the same
 * output field with no ordering between them.
 */
#[derive(Clone)]
pub struct RequestHandler {
    inner: Arc<HandlerInner>,
}

struct HandlerInner {
    client: Client,
    base_url: Url,
    endpoint_path: String,
    format: Box<dyn ResponseFormat>,
    handles: Handles,
}

// ***************************************************************************
//                             Handler Methods
// ***************************************************************************
impl RequestHandler {
    // -----------------------------------------------------------------------
    // new:
    // -----------------------------------------------------------------------
    pub fn new(settings: &HandlerSettings, handles: Handles) -> Result<Self, Errors> {
        // Reject unusable endpoint configurations before the first click.
        let base_url = parse_base_url(&settings.base_url)?;
        build_greeting_url(&base_url, &settings.endpoint_path, "")?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Errors::Transport(e.to_string()))?;

        info!("Greeting handler targets {}{} using the {} response format.",
              base_url, settings.endpoint_path, settings.response_format);

        Ok(Self {
            inner: Arc::new(HandlerInner {
                client,
                base_url,
                endpoint_path: settings.endpoint_path.clone(),
                format: settings.response_format.strategy(),
                handles,
            }),
        })
    }

    pub fn response_format(&self) -> ResponseFormatKind {
        self.inner.format.kind()
    }

    // -----------------------------------------------------------------------
    // handle_send_request:
    // -----------------------------------------------------------------------
    /** Run one complete invocation: read, validate, request and render.  The
     * only suspension point is the outbound request.
     */
    pub async fn handle_send_request(&self) -> Outcome {
        match self.read_name() {
            Ok(name) => self.dispatch(name).await,
            Err(_) => Outcome::Rejected,
        }
    }

    // -----------------------------------------------------------------------
    // spawn_send_request:
    // -----------------------------------------------------------------------
    /** Read and validate now, then finish the invocation on its own task.
     * Returns None when validation rejected the input.  Earlier tasks are
     * never cancelled, so the last response to arrive owns the display.
     */
    pub fn spawn_send_request(&self) -> Option<JoinHandle<Outcome>> {
        let name = self.read_name().ok()?;
        let handler = self.clone();
        Some(tokio::spawn(async move { handler.dispatch(name).await }))
    }

    // -----------------------------------------------------------------------
    // fetch_greeting:
    // -----------------------------------------------------------------------
    /** Send the greeting request and turn the reply into display text.  Any
     * non-2xx status is a failure regardless of its body.
     */
    pub async fn fetch_greeting(&self, name: &str) -> Result<String, Errors> {
        let url = build_greeting_url(&self.inner.base_url, &self.inner.endpoint_path, name)?;
        debug!("GET {}", url);

        let resp = self.inner.client.get(url)
            .send()
            .await
            .map_err(|e| Errors::Transport(e.to_string()))?;

        // Raw bytes so a text reply is shown exactly as sent, never repaired.
        let status = resp.status();
        let bytes = resp.bytes()
            .await
            .map_err(|e| Errors::ResponseBody(e.to_string()))?;
        if !status.is_success() {
            return Err(Errors::HttpStatus(status.as_u16(), String::from_utf8_lossy(&bytes).into_owned()));
        }
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| Errors::ResponseBody(e.to_string()))?;

        self.inner.format.render(&body)
    }

    // -----------------------------------------------------------------------
    // read_name:
    // -----------------------------------------------------------------------
    fn read_name(&self) -> Result<String, Errors> {
        match self.inner.handles.input.value() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => {
                self.inner.handles.alert.alert(EMPTY_NAME_MSG);
                Err(Errors::EmptyName)
            }
        }
    }

    // -----------------------------------------------------------------------
    // dispatch:
    // -----------------------------------------------------------------------
    async fn dispatch(&self, name: String) -> Outcome {
        let handles = &self.inner.handles;
        match self.fetch_greeting(&name).await {
            Ok(text) => {
                handles.output.set_text(&text);
                Outcome::Displayed(text)
            },
            Err(e) => {
                handles.diagnostics.record(DIAGNOSTIC_CONTEXT, &e);
                handles.output.set_text(FALLBACK_MSG);
                Outcome::Failed(e.to_string())
            },
        }
    }
}
