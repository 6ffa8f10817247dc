//! Credential helpers: masking for logs and vendor key-format checks.
//!
//! A format mismatch is only ever a warning: vendors rotate key formats, and
//! the authoritative check is `Provider::validate_key`.

use crate::types::ProviderName;

/// Mask an API key for display: first 4 + `...` + last 4 characters.
///
/// Keys shorter than 8 characters are fully hidden.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Check whether `key` looks like a credential issued by `provider`.
pub fn validate_key_format(provider: ProviderName, key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    match provider {
        ProviderName::Gemini => key
            .strip_prefix("AIza")
            .is_some_and(|rest| rest.len() >= 35 && rest.chars().all(is_url_safe)),
        ProviderName::DeepSeek => {
            let hex = key.strip_prefix("sk-").unwrap_or(key);
            hex.len() == 32 && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        ProviderName::Mistral => {
            (key.len() == 32 || key.len() == 48) && key.chars().all(|c| c.is_ascii_alphanumeric())
        }
        ProviderName::OpenAi => key.starts_with("sk-") && key.len() > 20,
        ProviderName::Groq => key.starts_with("gsk_") && key.len() > 20,
    }
}

fn is_url_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
