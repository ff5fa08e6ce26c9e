//! Environment detection utilities for the Palaver pipeline.
//!
//! Centralizes logic for detecting whether we're running under CI or in a
//! development context, used to adjust log verbosity and test timeouts.

use std::env;

/// Checks if the application is running in a CI (Continuous Integration) environment.
pub fn is_ci() -> bool {
    env::var("CI").is_ok()
        || env::var("CONTINUOUS_INTEGRATION").is_ok()
        || env::var("GITHUB_ACTIONS").is_ok()
        || env::var("GITLAB_CI").is_ok()
        || env::var("TRAVIS").is_ok()
        || env::var("CIRCLECI").is_ok()
        || env::var("JENKINS_URL").is_ok()
        || env::var("BUILDKITE").is_ok()
}

/// Checks if the application is running in a development environment.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_dev_matches_debug_assertions() {
        assert_eq!(is_dev(), cfg!(debug_assertions));
    }
}
