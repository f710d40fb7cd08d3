//! CLI utility functions
//!
//! API-key lookup for commands that need one, and the single error
//! boundary that maps remote failures to a message plus a remedy.

use anyhow::Result;

use crate::output;
use crate::remote::ApiError;

use super::Context;

/// Resolve the API key (flag > env > stored) or fail with the dedicated
/// missing-key error.
pub fn require_api_key(ctx: &Context) -> Result<String> {
    ctx.settings
        .resolve_api_key(ctx.api_key.as_deref(), &ctx.env)
        .ok_or_else(|| ApiError::MissingKey.into())
}

/// Print a human-readable message (plus remedy) for a failed command.
///
/// Called once from main; the process then exits non-zero.
pub fn report_error(err: &anyhow::Error, verbose: bool) {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::MissingKey) => {
            output::print_error("No API key configured.");
            output::print_hint("Set your key: plx config set-key <your-api-key>");
            output::print_hint("Or set the PLX_API_KEY environment variable.");
        }
        Some(ApiError::Auth) => {
            output::print_error("Invalid or missing API key.");
            output::print_hint("Run: plx config set-key <your-api-key>");
        }
        Some(ApiError::RateLimited) => {
            output::print_error("Rate limit exceeded.");
            output::print_hint("Wait a moment and try again, or check your usage tier.");
        }
        Some(ApiError::BadRequest { message }) => {
            output::print_error("Bad request.");
            if message.to_lowercase().contains("model") {
                output::print_hint("The requested model may not be available. Run: plx models");
            } else {
                output::print_detail(message);
            }
        }
        Some(ApiError::Timeout) => {
            output::print_error("Request timed out.");
            output::print_hint("Check your internet connection and try again.");
        }
        Some(ApiError::Connect(_)) => {
            output::print_error("Unable to connect to the Perplexity API.");
            output::print_hint("Check your internet connection.");
        }
        Some(ApiError::Server { status, .. }) => {
            output::print_error(&format!("Perplexity API server error (status {status})."));
            output::print_hint("Try again in a moment.");
        }
        Some(ApiError::Status { status, message }) => {
            output::print_error(&format!("API returned status {status}."));
            output::print_detail(message);
        }
        Some(ApiError::Protocol(detail)) => {
            output::print_error("Malformed API response.");
            output::print_detail(detail);
        }
        None => {
            output::print_error(&err.to_string());
        }
    }

    if verbose {
        output::print_detail("\nDebug info:");
        for cause in err.chain() {
            output::print_detail(&format!("  {cause}"));
        }
    }
}
