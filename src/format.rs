//! Turns a webhook payload into channel-ready text.
//!
//! Produces a plain title/body pair (truncated for push notifications) and
//! an HTML rendering for Telegram that carries the memo's hashtags and
//! creation time.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::config::MemosConfig;
use crate::memo::{MemoRecord, NotificationPayload, format_timestamp};

/// Push bodies longer than this are cut.
pub const MAX_BODY_CHARS: usize = 200;
/// Characters kept from an over-long body before the ellipsis.
pub const TRUNCATED_BODY_CHARS: usize = 197;
const ELLIPSIS: &str = "...";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("valid placeholder regex"));

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([^\s#]+)").expect("valid hashtag regex"));

/// Title/body pattern for one activity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl MessageTemplate {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn format_title(&self, placeholders: &HashMap<&str, String>) -> String {
        apply_template(&self.title, placeholders)
    }

    pub fn format_body(&self, placeholders: &HashMap<&str, String>) -> String {
        apply_template(&self.body, placeholders)
    }
}

/// Output of [`MessageFormatter::format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub title: String,
    /// Body, truncated to [`MAX_BODY_CHARS`].
    pub body: String,
    /// Telegram HTML rendering built from the untruncated title and body.
    pub html: String,
}

/// Formats memos using the configured templates and user-name map.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    config: Arc<MemosConfig>,
}

impl MessageFormatter {
    pub fn new(config: Arc<MemosConfig>) -> Self {
        Self { config }
    }

    pub fn format(&self, payload: &NotificationPayload, memo: &MemoRecord) -> FormattedMessage {
        let creator = self.config.display_name(&payload.creator);
        let placeholders = placeholders(&creator, memo);

        let (title, full_body) = match self.config.template(&payload.activity_type) {
            Some(template) => (
                template.format_title(&placeholders),
                template.format_body(&placeholders),
            ),
            None => (
                fallback_title(&payload.activity_type).to_string(),
                memo.content.clone(),
            ),
        };

        let html = render_html(&title, &full_body, memo);
        let body = truncate_body(&full_body);

        FormattedMessage { title, body, html }
    }
}

fn placeholders(creator: &str, memo: &MemoRecord) -> HashMap<&'static str, String> {
    HashMap::from([
        ("creator", creator.to_string()),
        ("content", memo.content.clone()),
        ("createTime", format_timestamp(memo.create_time)),
        ("updateTime", format_timestamp(memo.update_time)),
        ("visibility", memo.visibility.to_string()),
    ])
}

/// Replace each `{key}` with its value in one pass. Unknown keys stay as-is,
/// and substituted values are never re-scanned.
pub fn apply_template(template: &str, placeholders: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match placeholders.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Default title when no template is registered for an activity type.
pub fn fallback_title(activity_type: &str) -> &'static str {
    match activity_type {
        "memo.created" => "New Memo",
        "memo.updated" => "Memo Updated",
        "memo.deleted" => "Memo Deleted",
        _ => "Memo Notify",
    }
}

/// Cut bodies over [`MAX_BODY_CHARS`] characters down to
/// [`TRUNCATED_BODY_CHARS`] plus an ellipsis.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(TRUNCATED_BODY_CHARS).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Hashtags in memo content, without the leading `#`.
pub fn extract_tags(content: &str) -> Vec<&str> {
    HASHTAG
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

fn render_html(title: &str, body: &str, memo: &MemoRecord) -> String {
    let mut message = format!("<b>{}</b>\n\n{}", escape_html(title), escape_html(body));

    let tags = extract_tags(&memo.content);
    if !tags.is_empty() {
        let tag_line = tags
            .iter()
            .map(|t| format!("#{}", escape_html(t)))
            .collect::<Vec<_>>()
            .join(" ");
        message.push_str("\n\n");
        message.push_str(&tag_line);
    }

    let created = format_timestamp(memo.create_time);
    if !created.is_empty() {
        message.push_str(&format!("\n\n<i>{created}</i>"));
    }

    message
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::{EpochSeconds, Visibility};

    fn payload(activity: &str, creator: &str) -> NotificationPayload {
        NotificationPayload {
            activity_type: activity.into(),
            creator: creator.into(),
            ..Default::default()
        }
    }

    fn memo(content: &str) -> MemoRecord {
        MemoRecord {
            name: "memos/1".into(),
            content: content.into(),
            ..Default::default()
        }
    }

    fn formatter(config: MemosConfig) -> MessageFormatter {
        MessageFormatter::new(Arc::new(config))
    }

    // ── Fallback formatting ─────────────────────────────────────────

    #[test]
    fn fallback_titles_by_activity() {
        assert_eq!(fallback_title("memo.created"), "New Memo");
        assert_eq!(fallback_title("memo.updated"), "Memo Updated");
        assert_eq!(fallback_title("memo.deleted"), "Memo Deleted");
        assert_eq!(fallback_title("memo.comment"), "Memo Notify");
        assert_eq!(fallback_title(""), "Memo Notify");
    }

    #[test]
    fn format_without_template_uses_content() {
        let f = formatter(MemosConfig::default());
        let out = f.format(&payload("memo.created", "1"), &memo("Buy milk"));
        assert_eq!(out.title, "New Memo");
        assert_eq!(out.body, "Buy milk");
        assert_eq!(out.html, "<b>New Memo</b>\n\nBuy milk");
    }

    // ── Templates ───────────────────────────────────────────────────

    #[test]
    fn template_substitutes_placeholders() {
        let mut config = MemosConfig::default();
        config.user_names.insert("1".into(), "Alice".into());
        config.message_templates.insert(
            "memo.created".into(),
            MessageTemplate::new("{creator} wrote", "[{visibility}] {content} @ {createTime}"),
        );

        let mut m = memo("hello");
        m.visibility = Visibility::Public;
        m.create_time = Some(EpochSeconds::new(0));

        let out = formatter(config).format(&payload("memo.created", "users/1"), &m);
        assert_eq!(out.title, "Alice wrote");
        assert_eq!(out.body, "[PUBLIC] hello @ 1970-01-01 00:00:00");
    }

    #[test]
    fn template_without_tokens_is_verbatim() {
        let mut config = MemosConfig::default();
        config.message_templates.insert(
            "memo.updated".into(),
            MessageTemplate::new("Static title", "Static body"),
        );
        let out = formatter(config).format(&payload("memo.updated", "1"), &memo("ignored"));
        assert_eq!(out.title, "Static title");
        assert_eq!(out.body, "Static body");
    }

    #[test]
    fn unknown_placeholders_left_literal() {
        let values = HashMap::from([("creator", "bob".to_string())]);
        assert_eq!(
            apply_template("{creator} {missing} {}", &values),
            "bob {missing} {}"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let values = HashMap::from([
            ("content", "{creator}".to_string()),
            ("creator", "bob".to_string()),
        ]);
        assert_eq!(apply_template("{content}", &values), "{creator}");
    }

    #[test]
    fn missing_timestamps_render_empty() {
        let mut config = MemosConfig::default();
        config.message_templates.insert(
            "memo.created".into(),
            MessageTemplate::new("t", "<{createTime}|{updateTime}>"),
        );
        let out = formatter(config).format(&payload("memo.created", "1"), &memo("x"));
        assert_eq!(out.body, "<|>");
    }

    #[test]
    fn template_lookup_misses_other_activity() {
        let mut config = MemosConfig::default();
        config
            .message_templates
            .insert("memo.created".into(), MessageTemplate::new("T", "B"));
        let out = formatter(config).format(&payload("memo.deleted", "1"), &memo("gone"));
        assert_eq!(out.title, "Memo Deleted");
        assert_eq!(out.body, "gone");
    }

    // ── Truncation ──────────────────────────────────────────────────

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("short"), "short");
        let exact = "a".repeat(200);
        assert_eq!(truncate_body(&exact), exact);
    }

    #[test]
    fn truncate_cuts_long_bodies() {
        let long = "b".repeat(201);
        let out = truncate_body(&long);
        assert_eq!(out, format!("{}...", "b".repeat(197)));
        assert_eq!(out.chars().count(), 200);
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let cjk = "字".repeat(200);
        assert_eq!(truncate_body(&cjk), cjk);

        let emoji = "🎉".repeat(250);
        let out = truncate_body(&emoji);
        assert_eq!(out.chars().count(), 200);
        assert!(out.ends_with("🎉..."));
    }

    #[test]
    fn html_uses_untruncated_body() {
        let long = "c".repeat(300);
        let out = formatter(MemosConfig::default())
            .format(&payload("memo.created", "1"), &memo(&long));
        assert_eq!(out.body.chars().count(), 200);
        assert!(out.html.contains(&long));
    }

    // ── Tags & HTML ─────────────────────────────────────────────────

    #[test]
    fn extract_tags_from_content() {
        assert_eq!(
            extract_tags("hello #world and #foo-bar"),
            vec!["world", "foo-bar"]
        );
        assert_eq!(extract_tags("#a#b"), vec!["a", "b"]);
        assert!(extract_tags("no tags # here").is_empty());
    }

    #[test]
    fn escape_html_special_chars() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn html_includes_tags_and_create_time() {
        let mut m = memo("Ship <v2> #release #team");
        m.create_time = Some(EpochSeconds::new(1_700_000_000));
        let out = formatter(MemosConfig::default()).format(&payload("memo.created", "1"), &m);
        assert_eq!(
            out.html,
            "<b>New Memo</b>\n\nShip &lt;v2&gt; #release #team\n\n#release #team\n\n<i>2023-11-14 22:13:20</i>"
        );
    }

    #[test]
    fn html_skips_out_of_range_create_time() {
        let mut m = memo("x");
        m.create_time = Some(EpochSeconds::new(i64::MAX));
        let out = formatter(MemosConfig::default()).format(&payload("memo.created", "1"), &m);
        assert_eq!(out.html, "<b>New Memo</b>\n\nx");
    }
}
