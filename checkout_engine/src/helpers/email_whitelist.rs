use log::*;
use regex::Regex;

/// Checks `email` against a comma-separated list of glob patterns (`*` matches any run of characters). Matching is
/// case-insensitive. Malformed patterns are logged and skipped.
pub fn is_test_email(whitelist: &str, email: &str) -> bool {
    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() {
        return false;
    }
    whitelist.split(',').map(str::trim).filter(|p| !p.is_empty()).any(|pattern| {
        let glob = pattern.to_ascii_lowercase().split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        match Regex::new(&format!("^{glob}$")) {
            Ok(re) => re.is_match(&email),
            Err(e) => {
                warn!("🛒️ Ignoring invalid email whitelist pattern '{pattern}'. {e}");
                false
            },
        }
    })
}
