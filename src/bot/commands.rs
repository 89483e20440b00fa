use teloxide::macros::BotCommands;
use teloxide::utils::command::BotCommands as _;

use crate::bot::handlers;
use crate::bot::messenger::notify;
use crate::bot::{AppState, Inbound};
use crate::error::ConversationError;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "Say hello")]
    Start,
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Start a conversation with the AI, optionally with a first question")]
    Ask(String),
    #[command(description = "End the current AI conversation")]
    End,
    #[command(rename = "t", description = "Translate text between Chinese and English")]
    Translate(String),
}

pub async fn handle_command(
    state: &AppState,
    inbound: &Inbound,
    cmd: BotCommand,
) -> Result<(), ConversationError> {
    let messenger = state.messenger.as_ref();

    match cmd {
        BotCommand::Start => {
            let greeting = match inbound.first_name.as_deref() {
                Some(name) => format!("Hello, {name}! Glad to be of service."),
                None => "Hello! Glad to be of service.".to_string(),
            };
            let greeting = format!("{greeting}\nSend /help to see what I can do.");
            notify(messenger, inbound.chat_id, &greeting).await;
        }

        BotCommand::Help => {
            notify(messenger, inbound.chat_id, &BotCommand::descriptions().to_string()).await;
        }

        BotCommand::Ask(prompt) => {
            state.controller().start(&inbound.key(), &prompt).await?;
        }

        BotCommand::End => {
            state.controller().end(&inbound.key()).await?;
        }

        BotCommand::Translate(text) => {
            handlers::translate(state, inbound.chat_id, &text).await;
        }
    }

    Ok(())
}
