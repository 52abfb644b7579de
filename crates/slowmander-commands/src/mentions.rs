//! Parsing of platform mention markup and raw ids in argument tokens.

use slowmander_common::{parse_snowflake, ChannelId, EmojiId, RoleId, UserId};

/// A custom emoji reference parsed from `<:name:id>` or `<a:name:id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiRef {
    /// Emoji id.
    pub id: EmojiId,
    /// Emoji name as written in the markup.
    pub name: String,
    /// Whether the markup was for an animated emoji.
    pub animated: bool,
}

fn wrapped<'a>(token: &'a str, open: &str) -> Option<&'a str> {
    token.strip_prefix(open)?.strip_suffix('>')
}

/// Parses `<@id>`, `<@!id>` or a raw id.
pub fn parse_user(token: &str) -> Option<UserId> {
    let raw = wrapped(token, "<@!")
        .or_else(|| wrapped(token, "<@").filter(|inner| !inner.starts_with('&')))
        .unwrap_or(token);
    parse_snowflake(raw).map(UserId)
}

/// Parses `<#id>` or a raw id.
pub fn parse_channel(token: &str) -> Option<ChannelId> {
    parse_snowflake(wrapped(token, "<#").unwrap_or(token)).map(ChannelId)
}

/// Parses `<@&id>` or a raw id.
pub fn parse_role(token: &str) -> Option<RoleId> {
    parse_snowflake(wrapped(token, "<@&").unwrap_or(token)).map(RoleId)
}

/// Parses custom emoji markup. Raw ids yield an empty name.
pub fn parse_emoji(token: &str) -> Option<EmojiRef> {
    if let Some(id) = parse_snowflake(token) {
        return Some(EmojiRef {
            id: EmojiId(id),
            name: String::new(),
            animated: false,
        });
    }

    let (animated, inner) = match wrapped(token, "<a:") {
        Some(inner) => (true, inner),
        None => (false, wrapped(token, "<:")?),
    };
    let (name, id) = inner.rsplit_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some(EmojiRef {
        id: EmojiId(parse_snowflake(id)?),
        name: name.to_string(),
        animated,
    })
}

/// Case-insensitive name prefix match used as the fallback for entity lookup.
pub fn name_matches(candidate: &str, token: &str) -> bool {
    !token.is_empty()
        && candidate
            .to_lowercase()
            .starts_with(&token.to_lowercase())
}
