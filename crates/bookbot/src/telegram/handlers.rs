//! Dispatcher schema: maps Telegram updates onto conversation engine events

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

use super::bot::Command;
use crate::engine::{ConversationEngine, Inbound};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub engine: Arc<ConversationEngine>,
}

impl HandlerDeps {
    pub fn new(engine: Arc<ConversationEngine>) -> Self {
        Self { engine }
    }
}

/// Creates the dispatcher schema for the bot.
///
/// Commands are tried first, then plain text, then button presses.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

async fn dispatch(deps: &HandlerDeps, chat: ChatId, event: Inbound) {
    if let Err(e) = deps.engine.handle(chat, event).await {
        log::error!("Chat {}: failed to handle event: {}", chat, e);
    }
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                match cmd {
                    Command::Start => dispatch(&deps, msg.chat.id, Inbound::Start).await,
                    Command::Help => {
                        bot.send_message(msg.chat.id, Command::descriptions().to_string())
                            .await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| msg.text().map(str::to_owned))
        .endpoint(move |msg: Message, text: String| {
            let deps = deps.clone();
            async move {
                dispatch(&deps, msg.chat.id, Inbound::Text(text)).await;
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            // Stop the client-side spinner regardless of what the press does.
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            let chat = q.message.as_ref().map(|m| m.chat().id);
            match (chat, q.data) {
                (Some(chat), Some(data)) => dispatch(&deps, chat, Inbound::Callback(data)).await,
                _ => log::info!("Callback query {:?} without message or data ignored", q.id),
            }
            Ok(())
        }
    })
}
