//! Slash commands answered straight from the tools, without the model.

use serde_json::json;
use tracing::warn;

use super::super::AgentsState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Command {
    Start,
    Help,
    Today,
    Week,
    Goals,
    Undo,
    /// `/weight` alone shows history; with an argument it records.
    Weight(Option<String>),
    Memory,
    Unknown(String),
}

/// Parse a message starting with `/`; `None` for ordinary text.
/// A `@botname` suffix on the command word is ignored.
pub(super) fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    let word = word.split('@').next().unwrap_or_default().to_lowercase();
    Some(match word.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "today" => Command::Today,
        "week" => Command::Week,
        "goals" => Command::Goals,
        "undo" => Command::Undo,
        "weight" => Command::Weight(arg),
        "memory" => Command::Memory,
        _ => Command::Unknown(word),
    })
}

pub(super) fn help_text() -> &'static str {
    "Tell me what you ate (\"two eggs and toast for breakfast\") and I will log it.\n\
     \n\
     /today - meals and progress for today\n\
     /week - the last 7 days\n\
     /goals - your daily targets\n\
     /undo - delete the last meal\n\
     /weight [kg] - record or show your weight\n\
     /memory - what I remember about you\n\
     /help - this message"
}

pub(super) async fn run(command: Command, user_id: &str, state: &AgentsState) -> String {
    match command {
        Command::Start => format!(
            "Hi! I'm {}, your nutrition assistant.\n\n{}",
            state.bot_name,
            help_text()
        ),
        Command::Help => help_text().to_string(),
        Command::Today => {
            let meals = tool(state, user_id, "get_today_meals", json!({})).await;
            let progress = tool(state, user_id, "get_daily_progress", json!({})).await;
            format!("{meals}\n\n{progress}")
        }
        Command::Week => tool(state, user_id, "get_week_meals", json!({})).await,
        Command::Goals => tool(state, user_id, "get_user_goals", json!({})).await,
        Command::Undo => tool(state, user_id, "delete_last_meal", json!({})).await,
        Command::Weight(Some(kg)) => tool(state, user_id, "save_weight", json!({ "weight": kg })).await,
        Command::Weight(None) => tool(state, user_id, "get_weight_history", json!({})).await,
        Command::Memory => tool(state, user_id, "recall_memories", json!({})).await,
        Command::Unknown(word) => format!("Unknown command /{word}. Send /help to see what I can do."),
    }
}

async fn tool(state: &AgentsState, user_id: &str, name: &str, args: serde_json::Value) -> String {
    match state.execute_tool(name, args.to_string(), user_id).await {
        Ok(reply) if reply.ok => reply.message(),
        Ok(reply) => format!("Sorry, that didn't work: {}", reply.message()),
        Err(e) => {
            warn!(tool = name, user_id, error = %e.message, "command tool call failed");
            "Sorry, something went wrong. Please try again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("two eggs"), None);
    }

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(parse("/today"), Some(Command::Today));
        assert_eq!(parse("  /Week  "), Some(Command::Week));
        assert_eq!(parse("/undo@NutriBot"), Some(Command::Undo));
        assert_eq!(parse("/weight 81,5"), Some(Command::Weight(Some("81,5".into()))));
        assert_eq!(parse("/weight   "), Some(Command::Weight(None)));
        assert_eq!(parse("/dance"), Some(Command::Unknown("dance".into())));
    }
}
