//! Review surface rendering and delivery.
//!
//! Component selection scales with how many detections are pending:
//! a single detection gets per-action buttons, a handful gets a selection
//! menu plus bulk buttons, and a large batch gets the menu alone. Once the
//! last detection is decided the message collapses to a plain confirmation.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::Result;
use crate::traits::{notify::NotificationGateway, store::PipelineStore};
use crate::types::{
    appearance::ModAppearance,
    message::{
        Button, ButtonStyle, MessageBody, MessageField, MessageHandle, RenderableMessage,
        SelectMenu, SelectOption, StatusGlyph,
    },
    post::ContentPost,
    registry::Mod,
};

/// Upper bound the selection menu can carry; overflow is truncated.
pub const SELECT_MENU_CAP: usize = 25;

/// Pending counts above one and up to this get bulk action buttons.
pub const BULK_BUTTON_CAP: usize = 5;

/// Labels longer than this are cut to fit component constraints.
pub const LABEL_CAP: usize = 80;

const THREAD_TITLE_CAP: usize = 80;

/// One appearance paired with its resolved mod, as rendered.
pub struct ReviewEntry {
    pub appearance: ModAppearance,
    pub mod_record: Option<Mod>,
}

/// Sends and refreshes review messages for pending detections.
pub struct ReviewNotifier<S, G> {
    store: Arc<S>,
    gateway: Arc<G>,
    review_channel_id: Option<String>,
}

impl<S, G> ReviewNotifier<S, G>
where
    S: PipelineStore,
    G: NotificationGateway,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>, review_channel_id: Option<String>) -> Self {
        Self {
            store,
            gateway,
            review_channel_id,
        }
    }

    /// Render and deliver the review message for a post's pending detections.
    ///
    /// No-op when the review channel is unconfigured, the post is unknown, or
    /// nothing is pending. Delivery failure is logged, not propagated: the
    /// detections stay pending and reachable through the review listing.
    pub async fn notify_detections(&self, post_id: &str) -> Result<Option<MessageHandle>> {
        let Some(channel) = &self.review_channel_id else {
            warn!("review channel not configured, skipping review notification");
            return Ok(None);
        };

        let Some(post) = self.store.get_post(post_id).await? else {
            return Ok(None);
        };
        let pending = self.store.pending_for_post(post_id).await?;
        if pending.is_empty() {
            return Ok(None);
        }

        let entries = self.load_entries(pending).await?;
        let author = self.store.author_for_feed(&post.feed_source_id).await?;
        let message =
            render_review_message(&post, &entries, author.as_ref().map(|a| a.name.as_str()));

        let handle = match self.gateway.send(channel, message).await {
            Ok(handle) => handle,
            Err(err) => {
                error!(post_id, %err, "failed to deliver review message");
                return Ok(None);
            }
        };

        // A thread gives multi-detection posts a place to discuss borderline
        // matches; single detections resolve inline.
        let thread_id = if entries.len() >= 2 {
            let title: String = post.title.chars().take(THREAD_TITLE_CAP).collect();
            match self
                .gateway
                .create_thread(&handle, &format!("Review: {title}"))
                .await
            {
                Ok(thread) => Some(thread.thread_id),
                Err(err) => {
                    warn!(post_id, %err, "failed to create review thread");
                    None
                }
            }
        } else {
            None
        };

        self.store
            .set_message_handles(post_id, &handle.message_id, thread_id.as_deref())
            .await?;

        debug!(post_id, message_id = %handle.message_id, "review message delivered");
        Ok(Some(handle))
    }

    /// Re-render the review message after a decision.
    ///
    /// When nothing is pending anymore the message collapses to a plain
    /// all-reviewed confirmation with no components.
    pub async fn refresh_message(&self, message_id: &str) -> Result<()> {
        let Some(channel) = &self.review_channel_id else {
            return Ok(());
        };
        let handle = MessageHandle::new(channel.clone(), message_id);

        let pending = self.store.pending_for_message(message_id).await?;
        if pending.is_empty() {
            self.gateway
                .edit(&handle, RenderableMessage::text("✅ All detections reviewed."))
                .await?;
            return Ok(());
        }

        let post_id = pending[0].post_id.clone();
        let Some(post) = self.store.get_post(&post_id).await? else {
            return Ok(());
        };
        let entries = self.load_entries(pending).await?;
        let author = self.store.author_for_feed(&post.feed_source_id).await?;
        let message =
            render_review_message(&post, &entries, author.as_ref().map(|a| a.name.as_str()));
        self.gateway.edit(&handle, message).await?;
        Ok(())
    }

    async fn load_entries(&self, pending: Vec<ModAppearance>) -> Result<Vec<ReviewEntry>> {
        let mut entries = Vec::with_capacity(pending.len());
        for appearance in pending {
            let mod_record = match appearance.mod_id {
                Some(id) => self.store.get_mod(id).await?,
                None => None,
            };
            entries.push(ReviewEntry {
                appearance,
                mod_record,
            });
        }
        Ok(entries)
    }
}

/// Status glyph for one rendered entry.
///
/// Precedence: an operator-verified or up-to-date linked mod reads as done, a
/// linked mod behind upstream warns, an unlinked detection with a plausible
/// fuzzy suggestion points at it, and everything else is unidentified.
pub fn status_glyph(appearance: &ModAppearance, mod_record: Option<&Mod>) -> StatusGlyph {
    if appearance.verified {
        return StatusGlyph::Done;
    }
    match mod_record {
        Some(m) if m.is_up_to_date && !appearance.needs_update => StatusGlyph::Done,
        Some(_) => StatusGlyph::Warning,
        None if appearance.suggested_mod_id.is_some() => StatusGlyph::Similar,
        None => StatusGlyph::Unidentified,
    }
}

fn status_line(entry: &ReviewEntry) -> String {
    let appearance = &entry.appearance;
    let glyph = status_glyph(appearance, entry.mod_record.as_ref());
    let percent = (appearance.confidence * 100.0).round() as u32;

    match glyph {
        StatusGlyph::Done => format!("{} Matched ({percent}%)", glyph.as_emoji()),
        StatusGlyph::Warning => {
            let have = entry
                .mod_record
                .as_ref()
                .and_then(|m| m.translated_version.as_deref())
                .unwrap_or("none");
            format!("{} Needs update (have: {have})", glyph.as_emoji())
        }
        StatusGlyph::Similar => {
            let suggestion = appearance
                .suggested_mod_name
                .as_deref()
                .unwrap_or("a known mod");
            format!("{} Similar to {suggestion} ({percent}%)", glyph.as_emoji())
        }
        StatusGlyph::Unidentified => format!("{} Unidentified ({percent}%)", glyph.as_emoji()),
    }
}

fn truncate_label(label: &str) -> String {
    label.chars().take(LABEL_CAP).collect()
}

/// Build the review message for a post's pending detections.
///
/// Pure: rendering depends only on its inputs, so the component rules are
/// unit-testable without a store or gateway.
pub fn render_review_message(
    post: &ContentPost,
    entries: &[ReviewEntry],
    author_name: Option<&str>,
) -> RenderableMessage {
    let mut description = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let appearance = &entry.appearance;
        let version = appearance
            .detected_version
            .as_deref()
            .map(|v| format!("v{v}"))
            .unwrap_or_else(|| "no version".to_string());
        description.push_str(&format!(
            "{}. **{}** ({version})\n   └ {}\n",
            i + 1,
            appearance.detected_name,
            status_line(entry)
        ));
    }

    let mut body = MessageBody::new(format!("📦 {} mod(s) detected", entries.len()))
        .with_url(post.url.clone())
        .with_field(MessageField::new(
            "Post",
            format!("[{}]({})", post.title, post.url),
        ))
        .with_field(
            MessageField::new(
                "Published",
                post.published_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            )
            .inline(),
        );
    if let Some(author) = author_name {
        body = body.with_field(MessageField::new("Author", author).inline());
    }
    body = body.with_field(MessageField::new("Detections", description.trim_end()));

    match entries.len() {
        0 => RenderableMessage::WithFields { body },
        1 => RenderableMessage::WithButtons {
            buttons: action_buttons(&entries[0].appearance),
            body,
        },
        n if n <= BULK_BUTTON_CAP => RenderableMessage::WithSelectMenu {
            menu: select_menu(entries),
            buttons: bulk_buttons(),
            body,
        },
        _ => RenderableMessage::WithSelectMenu {
            menu: select_menu(entries),
            buttons: Vec::new(),
            body,
        },
    }
}

fn action_buttons(appearance: &ModAppearance) -> Vec<Button> {
    let id = appearance.id;
    vec![
        Button::new(format!("mod_confirm_{id}"), "Confirm", ButtonStyle::Success)
            .disabled(appearance.mod_id.is_none()),
        Button::new(format!("mod_link_{id}"), "Link", ButtonStyle::Primary),
        Button::new(format!("mod_create_{id}"), "Create", ButtonStyle::Secondary),
        Button::new(format!("mod_ignore_{id}"), "Ignore", ButtonStyle::Danger),
    ]
}

fn bulk_buttons() -> Vec<Button> {
    vec![
        Button::new("mod_confirm_all", "Confirm all linked", ButtonStyle::Success),
        Button::new("mod_ignore_all", "Ignore all", ButtonStyle::Danger),
    ]
}

fn select_menu(entries: &[ReviewEntry]) -> SelectMenu {
    let options = entries
        .iter()
        .take(SELECT_MENU_CAP)
        .map(|entry| {
            let appearance = &entry.appearance;
            SelectOption {
                value: appearance.id.to_string(),
                label: truncate_label(&appearance.detected_name),
                description: appearance
                    .detected_version
                    .as_ref()
                    .map(|v| truncate_label(&format!("v{v}"))),
                glyph: Some(status_glyph(appearance, entry.mod_record.as_ref())),
            }
        })
        .collect();

    SelectMenu {
        id: "mod_review_select".to_string(),
        placeholder: "Pick a detection to review...".to_string(),
        options,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::types::post::{ContentPost, FeedItem};

    fn post() -> ContentPost {
        let item = FeedItem {
            id: "p1".to_string(),
            title: "Mod X Update 1.2".to_string(),
            url: "https://example.com/posts/p1".to_string(),
            content: String::new(),
            published_at: Utc::now(),
            post_type: None,
            min_cents_pledged: None,
        };
        ContentPost::from_item(&item, "feed-1")
    }

    fn entry(name: &str) -> ReviewEntry {
        let mut appearance = ModAppearance::new("p1", name);
        appearance.detected_version = Some("1.2".to_string());
        ReviewEntry {
            appearance,
            mod_record: None,
        }
    }

    fn entries(n: usize) -> Vec<ReviewEntry> {
        (0..n).map(|i| entry(&format!("Mod {i}"))).collect()
    }

    #[test]
    fn single_detection_gets_action_buttons() {
        let message = render_review_message(&post(), &entries(1), None);
        let RenderableMessage::WithButtons { buttons, .. } = message else {
            panic!("expected buttons variant");
        };
        assert_eq!(buttons.len(), 4);
        assert!(buttons[0].id.starts_with("mod_confirm_"));
        // Unlinked detections cannot be confirmed directly.
        assert!(buttons[0].disabled);
        assert!(buttons[3].id.starts_with("mod_ignore_"));
    }

    #[test]
    fn published_field_carries_the_formatted_timestamp() {
        let post = post();
        let message = render_review_message(&post, &entries(1), None);
        let RenderableMessage::WithButtons { body, .. } = message else {
            panic!("expected buttons variant");
        };
        let published = body.fields.iter().find(|f| f.name == "Published").unwrap();
        assert_eq!(
            published.value,
            post.published_at.format("%Y-%m-%d %H:%M UTC").to_string()
        );
        assert!(published.inline);
    }

    #[test]
    fn small_batch_gets_menu_and_bulk_buttons() {
        let message = render_review_message(&post(), &entries(3), None);
        let RenderableMessage::WithSelectMenu { menu, buttons, .. } = message else {
            panic!("expected select-menu variant");
        };
        assert_eq!(menu.options.len(), 3);
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].id, "mod_confirm_all");
    }

    #[test]
    fn large_batch_gets_menu_only_truncated_to_cap() {
        let message = render_review_message(&post(), &entries(30), None);
        let RenderableMessage::WithSelectMenu { menu, buttons, .. } = message else {
            panic!("expected select-menu variant");
        };
        assert_eq!(menu.options.len(), SELECT_MENU_CAP);
        assert!(buttons.is_empty());
    }

    #[test]
    fn long_names_are_cut_to_the_label_cap() {
        let long = "x".repeat(200);
        let message = render_review_message(&post(), &[entry(&long), entry("other")], None);
        let RenderableMessage::WithSelectMenu { menu, .. } = message else {
            panic!("expected select-menu variant");
        };
        assert_eq!(menu.options[0].label.chars().count(), LABEL_CAP);
    }

    #[test]
    fn glyph_precedence() {
        let author_id = Uuid::new_v4();

        let mut verified = ModAppearance::new("p1", "A");
        verified.verified = true;
        assert_eq!(status_glyph(&verified, None), StatusGlyph::Done);

        let mut linked_behind = ModAppearance::new("p1", "B");
        let mut mod_record = Mod::new(author_id, "B");
        mod_record.is_up_to_date = false;
        linked_behind.mod_id = Some(mod_record.id);
        assert_eq!(
            status_glyph(&linked_behind, Some(&mod_record)),
            StatusGlyph::Warning
        );

        let mut suggested = ModAppearance::new("p1", "C");
        suggested.suggested_mod_id = Some(Uuid::new_v4());
        assert_eq!(status_glyph(&suggested, None), StatusGlyph::Similar);

        assert_eq!(
            status_glyph(&ModAppearance::new("p1", "D"), None),
            StatusGlyph::Unidentified
        );
    }
}
