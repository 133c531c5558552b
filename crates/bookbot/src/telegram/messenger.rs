//! Outbound messaging port and its Telegram implementation

use std::path::Path;

use async_trait::async_trait;
use bookcore::AppResult;
use teloxide::prelude::*;
use teloxide::types::InputFile;

use super::keyboards::Keyboard;

/// Everything the conversation engine and the relay send to a chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends text, optionally with a keyboard. `protect` forbids forwarding and saving.
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>, protect: bool) -> AppResult<()>;

    /// Sends a local file as a protected document.
    async fn send_document(&self, chat: ChatId, path: &Path, caption: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>, protect: bool) -> AppResult<()> {
        let request = self.bot.send_message(chat, text).protect_content(protect);
        match keyboard {
            Some(keyboard) => request.reply_markup(keyboard.to_markup()?).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn send_document(&self, chat: ChatId, path: &Path, caption: &str) -> AppResult<()> {
        self.bot
            .send_document(chat, InputFile::file(path.to_path_buf()))
            .caption(caption)
            .protect_content(true)
            .await?;
        Ok(())
    }
}
