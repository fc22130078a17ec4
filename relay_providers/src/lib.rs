#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod groq;

pub use groq::{DEFAULT_BASE_URL, DEFAULT_MODEL, GroqProvider};

use relay_core::{Credential, CredentialPool, Result};
use std::sync::Arc;

/// One client handle per non-blank API key, in the order given.
pub fn build_pool(api_keys: &[String], base_url: &str) -> Result<CredentialPool> {
    let credentials = api_keys
        .iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .enumerate()
        .map(|(i, key)| {
            let provider = GroqProvider::new(key.to_string()).with_base_url(base_url.to_string());
            Credential::new(format!("key #{}", i + 1), Arc::new(provider))
        })
        .collect();
    CredentialPool::new(credentials)
}
