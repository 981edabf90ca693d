//! Chat models offered when starting a new conversation.

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Chat-capable model identifiers, most capable first.
pub const CHAT_MODELS: &[&str] = &["gpt-4", "gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo"];

/// Get the built-in model list as owned identifiers.
pub fn default_models() -> Vec<String> {
    CHAT_MODELS.iter().map(|id| id.to_string()).collect()
}

/// Check whether an identifier names a chat-completions model
pub fn is_chat_model(id: &str) -> bool {
    if id.starts_with("gpt-4") || id.starts_with("gpt-3.5-turbo") {
        !id.contains("instruct") && !id.contains("embedding") && !id.contains("vision")
    } else {
        id.starts_with("o1") || id.starts_with("o3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_listed() {
        assert!(default_models().iter().any(|m| m == DEFAULT_MODEL));
    }

    #[test]
    fn test_is_chat_model() {
        assert!(is_chat_model("gpt-4"));
        assert!(is_chat_model("gpt-3.5-turbo-0125"));
        assert!(is_chat_model("o3-mini"));
        assert!(!is_chat_model("gpt-3.5-turbo-instruct"));
        assert!(!is_chat_model("text-embedding-3-small"));
    }
}
