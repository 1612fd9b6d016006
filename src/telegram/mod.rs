use std::fmt;

use serde::Deserialize;
use serde::de::IgnoredAny;

pub mod client;

pub use client::TelegramClient;

#[derive(Deserialize, Clone, Debug)]
#[must_use]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[must_use]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<IgnoredAny>,
    #[serde(default)]
    pub document: Option<IgnoredAny>,
    #[serde(default)]
    pub audio: Option<IgnoredAny>,
    #[serde(default)]
    pub video: Option<IgnoredAny>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    #[must_use]
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{first} {last}").trim().to_owned()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Photo,
    Document,
    Audio,
    Video,
    Other,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl Message {
    pub const fn kind(&self) -> MessageKind {
        if self.text.is_some() {
            MessageKind::Text
        } else if self.photo.is_some() {
            MessageKind::Photo
        } else if self.document.is_some() {
            MessageKind::Document
        } else if self.audio.is_some() {
            MessageKind::Audio
        } else if self.video.is_some() {
            MessageKind::Video
        } else {
            MessageKind::Other
        }
    }
}
