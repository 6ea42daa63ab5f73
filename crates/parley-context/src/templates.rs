use chrono::{DateTime, Local};

use parley_llm::{ChatMessage, ChatSettings};

/// System prompt used when a conversation has none of its own
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "Please respond in concise and clear language, prioritizing Chinese.
 Current model: <model>
 Current time: <time>";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// System prompt for `settings`, stamped with the current local time
pub fn system_prompt(settings: &ChatSettings) -> String {
    render_system_prompt(settings, Local::now())
}

pub fn render_system_prompt(settings: &ChatSettings, now: DateTime<Local>) -> String {
    match settings.system_message.as_deref() {
        Some(custom) if !custom.trim().is_empty() => custom.to_string(),
        _ => DEFAULT_SYSTEM_TEMPLATE
            .replace("<model>", &settings.model)
            .replace("<time>", &now.format(TIME_FORMAT).to_string()),
    }
}

/// Outbound message list: system prompt first, then the window
pub fn with_system_message(settings: &ChatSettings, window: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(window.len() + 1);
    messages.push(ChatMessage::system(system_prompt(settings)));
    messages.extend_from_slice(window);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parley_llm::Role;

    #[test]
    fn test_default_template() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let prompt = render_system_prompt(&ChatSettings::new("gpt-4o"), now);

        assert!(prompt.contains("Current model: gpt-4o"));
        assert!(prompt.contains("Current time: 2024-03-01 09:30:00"));
        assert!(!prompt.contains('<'));
    }

    #[test]
    fn test_custom_message_wins() {
        let settings = ChatSettings::new("gpt-4o").system_message("You are terse.");
        assert_eq!(system_prompt(&settings), "You are terse.");

        let blank = ChatSettings::new("gpt-4o").system_message("  ");
        assert!(system_prompt(&blank).contains("gpt-4o"));
    }

    #[test]
    fn test_system_message_first() {
        let window = vec![ChatMessage::user("hi")];
        let messages = with_system_message(&ChatSettings::new("m"), &window);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatMessage::user("hi"));
    }
}
