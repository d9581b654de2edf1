//! Renderable notification payloads.
//!
//! The pipeline constructs these but never transmits them; a
//! [`NotificationGateway`](crate::traits::notify::NotificationGateway)
//! implementation maps them onto whatever the chat platform expects. The
//! closed set of variants lets the review rendering rules be checked
//! exhaustively.

use serde::{Deserialize, Serialize};

/// Status glyph shown next to an appearance on the review surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusGlyph {
    /// Reviewed, or linked to an up-to-date mod.
    Done,
    /// Linked to a mod that is behind upstream.
    Warning,
    /// Unlinked but similar to a known mod (fuzzy suggestion).
    Similar,
    /// Nothing in the registry resembles this detection.
    Unidentified,
}

impl StatusGlyph {
    /// Platform-neutral emoji rendering.
    pub fn as_emoji(self) -> &'static str {
        match self {
            Self::Done => "✅",
            Self::Warning => "⚠️",
            Self::Similar => "🔗",
            Self::Unidentified => "❓",
        }
    }
}

/// A titled field within a structured message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl MessageField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }
}

/// Structured body shared by the field-carrying variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub title: String,
    pub url: Option<String>,
    pub fields: Vec<MessageField>,
}

impl MessageBody {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_field(mut self, field: MessageField) -> Self {
        self.fields.push(field);
        self
    }
}

/// Visual weight of an action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonStyle {
    Success,
    Primary,
    Secondary,
    Danger,
}

/// An interactive action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Stable id routed back on click (e.g. `mod_confirm_<appearance-id>`).
    pub id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            style,
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// One entry of a selection menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Value routed back on selection (appearance id).
    pub value: String,
    pub label: String,
    pub description: Option<String>,
    pub glyph: Option<StatusGlyph>,
}

/// A selection menu over pending appearances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectMenu {
    pub id: String,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
}

/// A message the pipeline asks the notification sink to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderableMessage {
    /// Plain text, no structure or components.
    TextOnly { content: String },

    /// Structured body without interactive components.
    WithFields { body: MessageBody },

    /// Structured body plus a row of action buttons.
    WithButtons {
        body: MessageBody,
        buttons: Vec<Button>,
    },

    /// Structured body plus a selection menu and optional bulk buttons.
    WithSelectMenu {
        body: MessageBody,
        menu: SelectMenu,
        buttons: Vec<Button>,
    },
}

impl RenderableMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self::TextOnly {
            content: content.into(),
        }
    }

    /// The structured body, if this variant carries one.
    pub fn body(&self) -> Option<&MessageBody> {
        match self {
            Self::TextOnly { .. } => None,
            Self::WithFields { body }
            | Self::WithButtons { body, .. }
            | Self::WithSelectMenu { body, .. } => Some(body),
        }
    }

    /// Whether the message carries any interactive component.
    pub fn is_interactive(&self) -> bool {
        match self {
            Self::TextOnly { .. } | Self::WithFields { .. } => false,
            Self::WithButtons { buttons, .. } => !buttons.is_empty(),
            Self::WithSelectMenu { .. } => true,
        }
    }
}

/// Handle to a delivered message, usable for later edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub channel_id: String,
    pub message_id: String,
}

impl MessageHandle {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// Handle to a thread spawned off a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadHandle {
    pub thread_id: String,
}
