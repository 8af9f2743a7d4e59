//! # System Constants
//!
//! Well-known callback channel names and environment variable keys.

/// Names of the standard callback channels.
///
/// Modules invoke these; applications install handlers for the ones they can
/// answer. Payload types live in [`crate::standard`].
pub mod callbacks {
    /// Ask the user for credentials with full control over what is requested.
    pub const FULL_AUTHENTICATION: &str = "full-authentication";
    /// Fill credentials from a keyring without user interaction.
    pub const FILL_AUTHENTICATION: &str = "fill-authentication";
    /// Store credentials that led to a successful login.
    pub const SAVE_AUTHENTICATION: &str = "save-authentication";
    /// Older username/password prompt.
    pub const AUTHENTICATION: &str = "simple-authentication";
    /// Username/password prompt for an HTTP proxy.
    pub const HTTP_PROXY_AUTHENTICATION: &str = "http:proxy-authentication";
    /// Ask the user to pick one of several answers.
    pub const QUESTION: &str = "ask-question";
    /// Let the application add headers to an outgoing HTTP request.
    pub const HTTP_SEND_ADDITIONAL_HEADERS: &str = "http:send-additional-headers";
    /// Show the application the headers of an HTTP response.
    pub const HTTP_RECEIVED_HEADERS: &str = "http:received-headers";
    /// Progress or status text for the user.
    pub const STATUS_MESSAGE: &str = "status-message";

    pub const ALL: [&str; 9] = [
        FULL_AUTHENTICATION,
        FILL_AUTHENTICATION,
        SAVE_AUTHENTICATION,
        AUTHENTICATION,
        HTTP_PROXY_AUTHENTICATION,
        QUESTION,
        HTTP_SEND_ADDITIONAL_HEADERS,
        HTTP_RECEIVED_HEADERS,
        STATUS_MESSAGE,
    ];
}

/// Environment variables read by the configuration loader.
pub mod env {
    pub const ENVIRONMENT: &str = "CALLBACK_ENV";
    pub const FALLBACK_ENVIRONMENT: &str = "APP_ENV";
    pub const CONFIG_DIR: &str = "CALLBACK_CONFIG_DIR";
}
