#![forbid(unsafe_code)]

use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("saludo_client input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    #[error("Unable to create data directory {}: {}", .0, .1)]
    DataDirectory(String, String),

    #[error("Invalid greeting endpoint URL: {}", .0)]
    InvalidUrl(String),

    #[error("Unknown response format '{}', expected 'json' or 'text'", .0)]
    UnknownResponseFormat(String),

    // ----- Handler errors -----
    /// The name field was empty or blank; no request was sent.
    #[error("No name was entered")]
    EmptyName,

    /// The request could not be sent or no response was received.
    #[error("Greeting request failed: {}", .0)]
    Transport(String),

    #[error("Greeting endpoint returned HTTP {}: {}", .0, .1)]
    HttpStatus(u16, String),

    #[error("Unable to read greeting response body: {}", .0)]
    ResponseBody(String),

    #[error("Unable to parse greeting response: {}", .0)]
    ResponseParse(String),
}

impl Errors {
    /// True for the errors that occur after a request was attempted.
    pub fn is_transport_or_parse(&self) -> bool {
        matches!(self,
            Errors::Transport(_) | Errors::HttpStatus(_, _) |
            Errors::ResponseBody(_) | Errors::ResponseParse(_))
    }
}
