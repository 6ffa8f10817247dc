//! Vendor table: static specs for every supported vendor.
//!
//! Each `VendorSpec` describes how to reach a vendor: which wire format it
//! speaks, where its API lives, which models it ships by default, and how
//! caller-supplied model names are normalized for it.

use llmrelay_core::types::ProviderName;

// ─────────────────────────────────────────────
// VendorSpec: static metadata for one vendor
// ─────────────────────────────────────────────

/// Request/response dialect spoken by a vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    /// Google `models/{model}:generateContent`.
    Gemini,
    /// OpenAI-style `/chat/completions` with Bearer auth.
    OpenAiCompatible,
}

/// What to do with a model name the vendor does not recognise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownModel {
    /// Prepend the first family prefix (`"1.5-pro"` → `"gemini-1.5-pro"`).
    AddPrefix,
    /// Substitute the vendor's default model.
    UseDefault,
}

/// Static specification describing one vendor.
#[derive(Clone, Debug)]
pub struct VendorSpec {
    pub name: ProviderName,
    /// Human-readable name for logs. E.g. `"DeepSeek"`.
    pub display_name: &'static str,
    /// Conventional environment variable holding the key. E.g. `"GROQ_API_KEY"`.
    pub env_key: &'static str,
    pub wire: WireFormat,
    pub default_api_base: &'static str,
    /// Shipped defaults, never empty. The first entry is the vendor default.
    pub default_models: &'static [&'static str],
    /// Prefixes that mark a model as belonging to this vendor's family.
    pub family_prefixes: &'static [&'static str],
    /// Substring a discovered model id must contain to be kept.
    /// `None` keeps every listed model.
    pub model_filter: Option<&'static str>,
    pub unknown_model: UnknownModel,
}

impl VendorSpec {
    /// The vendor's default model.
    pub fn default_model(&self) -> &'static str {
        self.default_models.first().copied().unwrap_or_default()
    }

    /// Shipped defaults as owned strings.
    pub fn default_model_list(&self) -> Vec<String> {
        self.default_models.iter().map(|m| m.to_string()).collect()
    }

    /// Whether `model` carries one of this vendor's family prefixes.
    pub fn owns_model(&self, model: &str) -> bool {
        self.family_prefixes.iter().any(|p| model.starts_with(p))
    }

    /// Whether a discovered model id passes this vendor's listing filter.
    pub fn keeps_discovered(&self, model: &str) -> bool {
        self.model_filter.map_or(true, |f| model.contains(f))
    }
}

// ─────────────────────────────────────────────
// All vendors
// ─────────────────────────────────────────────

pub static GEMINI: VendorSpec = VendorSpec {
    name: ProviderName::Gemini,
    display_name: "Gemini",
    env_key: "GEMINI_API_KEY",
    wire: WireFormat::Gemini,
    default_api_base: "https://generativelanguage.googleapis.com/v1beta",
    default_models: &["gemini-1.5-pro", "gemini-1.5-flash"],
    family_prefixes: &["gemini-"],
    model_filter: Some("gemini"),
    unknown_model: UnknownModel::AddPrefix,
};

pub static DEEPSEEK: VendorSpec = VendorSpec {
    name: ProviderName::DeepSeek,
    display_name: "DeepSeek",
    env_key: "DEEPSEEK_API_KEY",
    wire: WireFormat::OpenAiCompatible,
    default_api_base: "https://api.deepseek.com/v1",
    default_models: &["deepseek-chat", "deepseek-coder"],
    family_prefixes: &["deepseek-"],
    model_filter: Some("deepseek"),
    unknown_model: UnknownModel::UseDefault,
};

pub static MISTRAL: VendorSpec = VendorSpec {
    name: ProviderName::Mistral,
    display_name: "Mistral",
    env_key: "MISTRAL_API_KEY",
    wire: WireFormat::OpenAiCompatible,
    default_api_base: "https://api.mistral.ai/v1",
    default_models: &["mistral-large-latest", "mistral-small-latest"],
    family_prefixes: &["mistral-", "open-mistral-", "open-mixtral-", "codestral-"],
    model_filter: None,
    unknown_model: UnknownModel::UseDefault,
};

pub static OPENAI: VendorSpec = VendorSpec {
    name: ProviderName::OpenAi,
    display_name: "OpenAI",
    env_key: "OPENAI_API_KEY",
    wire: WireFormat::OpenAiCompatible,
    default_api_base: "https://api.openai.com/v1",
    default_models: &["gpt-4o-mini", "gpt-4o"],
    family_prefixes: &["gpt-", "o1", "o3"],
    model_filter: Some("gpt"),
    unknown_model: UnknownModel::UseDefault,
};

pub static GROQ: VendorSpec = VendorSpec {
    name: ProviderName::Groq,
    display_name: "Groq",
    env_key: "GROQ_API_KEY",
    wire: WireFormat::OpenAiCompatible,
    default_api_base: "https://api.groq.com/openai/v1",
    default_models: &["llama-3.3-70b-versatile"],
    family_prefixes: &["llama-", "llama3-", "mixtral-", "gemma"],
    model_filter: None,
    unknown_model: UnknownModel::UseDefault,
};

/// Every vendor spec, in the order vendors are listed to users.
pub static VENDORS: [&VendorSpec; 5] = [&GEMINI, &DEEPSEEK, &MISTRAL, &OPENAI, &GROQ];

/// Look up the spec for a vendor.
pub fn spec_for(name: ProviderName) -> &'static VendorSpec {
    match name {
        ProviderName::Gemini => &GEMINI,
        ProviderName::DeepSeek => &DEEPSEEK,
        ProviderName::Mistral => &MISTRAL,
        ProviderName::OpenAi => &OPENAI,
        ProviderName::Groq => &GROQ,
    }
}

// ─────────────────────────────────────────────
// Model normalization
// ─────────────────────────────────────────────

/// Resolve the model identifier to send to the vendor.
///
/// Rules:
/// - `"default"` or empty → first known model, else the vendor default.
/// - A known model, or one already in the vendor's family → unchanged.
/// - Anything else → prefixed (Gemini) or replaced by the vendor default.
pub fn normalize_model(spec: &VendorSpec, model: &str, known: &[String]) -> String {
    let model = model.trim();

    if model.is_empty() || model.eq_ignore_ascii_case("default") {
        return known
            .first()
            .cloned()
            .unwrap_or_else(|| spec.default_model().to_string());
    }

    if known.iter().any(|m| m == model) || spec.owns_model(model) {
        return model.to_string();
    }

    match spec.unknown_model {
        UnknownModel::AddPrefix => {
            let prefix = spec.family_prefixes.first().copied().unwrap_or_default();
            format!("{prefix}{model}")
        }
        UnknownModel::UseDefault => spec.default_model().to_string(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn known(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_every_vendor_has_defaults() {
        for spec in VENDORS {
            assert!(!spec.default_models.is_empty(), "{} has no defaults", spec.name);
            assert!(!spec.family_prefixes.is_empty());
            assert_eq!(spec_for(spec.name).name, spec.name);
        }
    }

    #[test]
    fn test_vendor_order_matches_provider_names() {
        let names: Vec<ProviderName> = VENDORS.iter().map(|s| s.name).collect();
        assert_eq!(names, ProviderName::ALL.to_vec());
    }

    #[test]
    fn test_gemini_adds_prefix() {
        assert_eq!(normalize_model(&GEMINI, "1.5-flash", &[]), "gemini-1.5-flash");
        assert_eq!(normalize_model(&GEMINI, "gemini-1.5-pro", &[]), "gemini-1.5-pro");
    }

    #[test]
    fn test_deepseek_unknown_falls_back_to_default() {
        let models = known(&["deepseek-chat", "deepseek-coder"]);
        assert_eq!(normalize_model(&DEEPSEEK, "deepseek-coder", &models), "deepseek-coder");
        assert_eq!(normalize_model(&DEEPSEEK, "gpt-4o", &models), "deepseek-chat");
    }

    #[test]
    fn test_known_model_kept_even_without_prefix() {
        let models = known(&["open-nemo-2407"]);
        assert_eq!(normalize_model(&MISTRAL, "open-nemo-2407", &models), "open-nemo-2407");
    }

    #[test]
    fn test_default_uses_first_known_model() {
        let models = known(&["gemini-1.5-flash", "gemini-1.5-pro"]);
        assert_eq!(normalize_model(&GEMINI, "default", &models), "gemini-1.5-flash");
        assert_eq!(normalize_model(&GEMINI, "", &models), "gemini-1.5-flash");
    }

    #[test]
    fn test_default_without_known_models() {
        assert_eq!(normalize_model(&OPENAI, "default", &[]), "gpt-4o-mini");
        assert_eq!(normalize_model(&GROQ, "DEFAULT", &[]), "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_keeps_discovered() {
        assert!(GEMINI.keeps_discovered("gemini-1.5-pro"));
        assert!(!GEMINI.keeps_discovered("embedding-001"));
        assert!(MISTRAL.keeps_discovered("anything"));
    }
}
