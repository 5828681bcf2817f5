// The greeting request handler and the handles it is wired to.
pub mod handler;
pub mod response_format;
pub mod ui;
