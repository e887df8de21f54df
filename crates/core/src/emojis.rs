//! Icon registry shared by every rendered message.
//!
//! The registry maps asset names (as stored by `setup_emojis`) to custom emoji
//! references. Callers read through [`EmojiRegistry::get`]; the whole table is
//! swapped by [`EmojiRegistry::reload`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::domain::ids::EmojiId;

pub const UNKNOWN_GLYPH: &str = "❓";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiKey {
    Confirm,
    Cancel,
    Star,
    Notes,
    Photo,
    Others,
    Trash,
    Discord,
    Minecraft,
    Sites,
    Loading,
    Info,
}

impl EmojiKey {
    pub const ALL: [EmojiKey; 12] = [
        EmojiKey::Confirm,
        EmojiKey::Cancel,
        EmojiKey::Star,
        EmojiKey::Notes,
        EmojiKey::Photo,
        EmojiKey::Others,
        EmojiKey::Trash,
        EmojiKey::Discord,
        EmojiKey::Minecraft,
        EmojiKey::Sites,
        EmojiKey::Loading,
        EmojiKey::Info,
    ];

    /// Stem of the image file in the assets directory.
    pub fn asset_name(self) -> &'static str {
        match self {
            Self::Confirm => "check",
            Self::Cancel => "cross",
            Self::Star => "star",
            Self::Notes => "notes",
            Self::Photo => "camera",
            Self::Others => "book",
            Self::Trash => "siren",
            Self::Discord => "discord",
            Self::Minecraft => "minecraft",
            Self::Sites => "sites",
            Self::Loading => "loading",
            Self::Info => "info",
        }
    }

    /// Stem the assets and `emojis.json` of earlier bot versions used.
    pub fn legacy_asset_name(self) -> Option<&'static str> {
        match self {
            Self::Confirm => Some("certo"),
            Self::Cancel => Some("errado"),
            Self::Star => Some("estrela"),
            Self::Notes => Some("notas"),
            Self::Others => Some("livro"),
            Self::Trash => Some("sirene"),
            _ => None,
        }
    }

    pub fn default_glyph(self) -> &'static str {
        match self {
            Self::Confirm => "✅",
            Self::Cancel => "❌",
            Self::Star => "⭐",
            Self::Notes => "📝",
            Self::Photo => "📷",
            Self::Others => "📚",
            Self::Trash => "🗑️",
            Self::Discord => "🤖",
            Self::Minecraft => "🧱",
            Self::Sites => "🌐",
            Self::Loading => "⌛",
            Self::Info => "ℹ️",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmojiRef {
    Unicode { glyph: String },
    Custom { name: String, id: EmojiId, animated: bool },
}

impl EmojiRef {
    pub fn unicode(glyph: impl Into<String>) -> Self {
        Self::Unicode { glyph: glyph.into() }
    }

    /// Parses `<:name:id>` / `<a:name:id>`; any other non-empty text is a unicode glyph.
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if !reference.starts_with('<') {
            return Some(Self::unicode(reference));
        }

        let inner = reference.strip_prefix('<')?.strip_suffix('>')?;
        let mut parts = inner.split(':');
        let flag = parts.next()?;
        let name = parts.next()?;
        let id = parts.next()?.parse::<EmojiId>().ok()?;
        if parts.next().is_some() || name.is_empty() {
            return None;
        }

        let animated = match flag {
            "" => false,
            "a" => true,
            _ => return None,
        };
        Some(Self::Custom { name: name.to_owned(), id, animated })
    }

    pub fn custom_id(&self) -> Option<EmojiId> {
        match self {
            Self::Custom { id, .. } => Some(*id),
            Self::Unicode { .. } => None,
        }
    }
}

impl fmt::Display for EmojiRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicode { glyph } => f.write_str(glyph),
            Self::Custom { name, id, animated: false } => write!(f, "<:{name}:{id}>"),
            Self::Custom { name, id, animated: true } => write!(f, "<a:{name}:{id}>"),
        }
    }
}

#[derive(Clone, Default)]
pub struct EmojiRegistry {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl fmt::Debug for EmojiRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmojiRegistry").field("entries", &self.len()).finish()
    }
}

impl EmojiRegistry {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries: Arc::new(RwLock::new(entries)) }
    }

    /// Replaces the whole table.
    pub fn reload(&self, entries: HashMap<String, String>) {
        match self.entries.write() {
            Ok(mut guard) => *guard = entries,
            Err(poisoned) => *poisoned.into_inner() = entries,
        }
    }

    /// Current asset name first, then the legacy stem.
    pub fn get(&self, key: EmojiKey) -> EmojiRef {
        self.lookup(key.asset_name())
            .or_else(|| key.legacy_asset_name().and_then(|legacy| self.lookup(legacy)))
            .and_then(|reference| EmojiRef::parse(&reference))
            .unwrap_or_else(|| EmojiRef::unicode(key.default_glyph()))
    }

    /// Lookup by raw asset name; unknown names fall back to [`UNKNOWN_GLYPH`].
    pub fn get_by_name(&self, name: &str) -> EmojiRef {
        if let Some(key) = EmojiKey::ALL
            .into_iter()
            .find(|key| key.asset_name() == name || key.legacy_asset_name() == Some(name))
        {
            return self.get(key);
        }
        self.lookup(name)
            .and_then(|reference| EmojiRef::parse(&reference))
            .unwrap_or_else(|| EmojiRef::unicode(UNKNOWN_GLYPH))
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        self.read(|entries| entries.get(name).cloned())
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.read(Clone::clone)
    }

    pub fn len(&self) -> usize {
        self.read(HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, String>) -> T) -> T {
        match self.entries.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{EmojiKey, EmojiRef, EmojiRegistry, UNKNOWN_GLYPH};
    use crate::domain::ids::EmojiId;

    #[test]
    fn parses_static_and_animated_custom_references() {
        assert_eq!(
            EmojiRef::parse("<:check:123>"),
            Some(EmojiRef::Custom { name: "check".to_owned(), id: EmojiId(123), animated: false })
        );
        assert_eq!(
            EmojiRef::parse("<a:loading:77>"),
            Some(EmojiRef::Custom { name: "loading".to_owned(), id: EmojiId(77), animated: true })
        );
        assert_eq!(EmojiRef::parse("⭐"), Some(EmojiRef::unicode("⭐")));
    }

    #[test]
    fn rejects_broken_custom_references() {
        assert_eq!(EmojiRef::parse("<:check:notanumber>"), None);
        assert_eq!(EmojiRef::parse("<:check>"), None);
        assert_eq!(EmojiRef::parse("<x:check:1>"), None);
        assert_eq!(EmojiRef::parse("   "), None);
    }

    #[test]
    fn display_round_trips_custom_reference() {
        let reference = "<a:loading:77>";
        let parsed = EmojiRef::parse(reference).expect("parse");
        assert_eq!(parsed.to_string(), reference);
    }

    #[test]
    fn missing_or_broken_entries_fall_back_to_default_glyph() {
        let registry = EmojiRegistry::new(HashMap::from([(
            "star".to_owned(),
            "<:star:broken>".to_owned(),
        )]));

        assert_eq!(registry.get(EmojiKey::Star), EmojiRef::unicode("⭐"));
        assert_eq!(registry.get(EmojiKey::Confirm), EmojiRef::unicode("✅"));
        assert_eq!(registry.get_by_name("does-not-exist"), EmojiRef::unicode(UNKNOWN_GLYPH));
    }

    #[test]
    fn reload_replaces_the_whole_table() {
        let registry = EmojiRegistry::new(HashMap::from([(
            "check".to_owned(),
            "<:check:1>".to_owned(),
        )]));
        let reader = registry.clone();
        assert_eq!(reader.get(EmojiKey::Confirm).custom_id(), Some(EmojiId(1)));

        registry.reload(HashMap::from([("camera".to_owned(), "<:camera:2>".to_owned())]));

        assert_eq!(reader.get(EmojiKey::Confirm), EmojiRef::unicode("✅"));
        assert_eq!(reader.get(EmojiKey::Photo).custom_id(), Some(EmojiId(2)));
        assert_eq!(reader.len(), 1);
    }

    #[test]
    fn legacy_stems_resolve_to_their_keys() {
        let registry = EmojiRegistry::new(HashMap::from([
            ("certo".to_owned(), "<:certo:123>".to_owned()),
            ("estrela".to_owned(), "<:estrela:124>".to_owned()),
            ("camera".to_owned(), "<:camera:125>".to_owned()),
        ]));

        assert_eq!(registry.get(EmojiKey::Confirm).custom_id(), Some(EmojiId(123)));
        assert_eq!(registry.get(EmojiKey::Star).custom_id(), Some(EmojiId(124)));
        assert_eq!(registry.get(EmojiKey::Photo).custom_id(), Some(EmojiId(125)));
        assert_eq!(registry.get_by_name("estrela").custom_id(), Some(EmojiId(124)));
        assert_eq!(registry.get(EmojiKey::Cancel), EmojiRef::unicode("❌"));
    }

    #[test]
    fn current_stem_wins_over_legacy_stem() {
        let registry = EmojiRegistry::new(HashMap::from([
            ("check".to_owned(), "<:check:1>".to_owned()),
            ("certo".to_owned(), "<:certo:2>".to_owned()),
        ]));

        assert_eq!(registry.get(EmojiKey::Confirm).custom_id(), Some(EmojiId(1)));
    }
}
