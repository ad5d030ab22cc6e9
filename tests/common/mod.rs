//! Common test utilities for integration and Pact tests
//!
//! Provides rustls crypto provider setup and a helper for building mock
//! server URLs.

use std::sync::Once;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Must be called before any HTTP client is built. Uses a `Once` so every
/// test in a binary can call it.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // We use ring as the crypto provider (matches main application)
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Mock server base URL without the trailing slash
pub fn base_url(url: &impl std::fmt::Display) -> String {
    let mut base_url = url.to_string();
    if base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
