//! Common helpers shared across Slant crates.
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`SUPPORT_CONTACT`] and [`user_facing_message`]: how failures are shown
//!   to users
//!
//! ```rust
//! use slant_common::user_facing_message;
//!
//! let shown = user_facing_message("quick parse failed", "help@example.com");
//! assert!(shown.ends_with("help@example.com."));
//! ```

pub mod observability;

/// Default support address shown next to analysis failures.
pub const SUPPORT_CONTACT: &str = "support@slant.news";

/// Render an error message the way the UI shows it: the failure itself plus
/// an instruction to contact support.
pub fn user_facing_message(message: &str, support_contact: &str) -> String {
    let trimmed = message.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        format!("Analysis failed. If the problem persists, contact {support_contact}.")
    } else {
        format!("{trimmed}. If the problem persists, contact {support_contact}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_message_appends_contact() {
        let msg = user_facing_message("server returned error 500.", "a@b.c");
        assert_eq!(
            msg,
            "server returned error 500. If the problem persists, contact a@b.c."
        );
    }

    #[test]
    fn user_facing_message_handles_empty_input() {
        let msg = user_facing_message("   ", SUPPORT_CONTACT);
        assert!(msg.starts_with("Analysis failed."));
    }
}
