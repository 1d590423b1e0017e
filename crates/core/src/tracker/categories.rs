//! Abstract search categories and the per-tracker category table.
//!
//! Abstract categories follow the Newznab numbering scheme: parent categories
//! are whole thousands (2000 = Movies) and subcategories add tens
//! (2040 = Movies/HD). Trackers expose their own native codes, numeric or
//! string, which map many-to-many onto the abstract ones.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// An abstract (tracker-independent) search category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub u32);

impl Category {
    pub const CONSOLE: Category = Category(1000);
    pub const MOVIES: Category = Category(2000);
    pub const MOVIES_FOREIGN: Category = Category(2010);
    pub const MOVIES_OTHER: Category = Category(2020);
    pub const MOVIES_SD: Category = Category(2030);
    pub const MOVIES_HD: Category = Category(2040);
    pub const MOVIES_UHD: Category = Category(2045);
    pub const MOVIES_BLURAY: Category = Category(2050);
    pub const MOVIES_3D: Category = Category(2060);
    pub const MOVIES_DVD: Category = Category(2070);
    pub const MOVIES_WEBDL: Category = Category(2080);
    pub const AUDIO: Category = Category(3000);
    pub const AUDIO_MP3: Category = Category(3010);
    pub const AUDIO_VIDEO: Category = Category(3020);
    pub const AUDIO_AUDIOBOOK: Category = Category(3030);
    pub const AUDIO_LOSSLESS: Category = Category(3040);
    pub const AUDIO_OTHER: Category = Category(3050);
    pub const PC: Category = Category(4000);
    pub const PC_0DAY: Category = Category(4010);
    pub const PC_ISO: Category = Category(4020);
    pub const PC_MAC: Category = Category(4030);
    pub const PC_GAMES: Category = Category(4050);
    pub const TV: Category = Category(5000);
    pub const TV_WEBDL: Category = Category(5010);
    pub const TV_FOREIGN: Category = Category(5020);
    pub const TV_SD: Category = Category(5030);
    pub const TV_HD: Category = Category(5040);
    pub const TV_UHD: Category = Category(5045);
    pub const TV_SPORT: Category = Category(5060);
    pub const TV_ANIME: Category = Category(5070);
    pub const TV_DOCUMENTARY: Category = Category(5080);
    pub const XXX: Category = Category(6000);
    pub const BOOKS: Category = Category(7000);
    pub const BOOKS_MAGS: Category = Category(7010);
    pub const BOOKS_EBOOK: Category = Category(7020);
    pub const BOOKS_COMICS: Category = Category(7030);
    pub const BOOKS_TECHNICAL: Category = Category(7040);
    pub const OTHER: Category = Category(8000);

    /// Bucket for native codes missing from a tracker's table.
    pub const UNCATEGORIZED: Category = Category(8000);

    /// Whether this is a top-level category (1000, 2000, ...).
    pub fn is_parent(self) -> bool {
        self.0 % 1000 == 0
    }

    /// The top-level category this one belongs to.
    pub fn parent(self) -> Category {
        Category(self.0 / 1000 * 1000)
    }

    /// Whether a query for `self` should include results tagged `other`.
    ///
    /// A parent matches its whole family; a subcategory matches only itself.
    pub fn covers(self, other: Category) -> bool {
        self == other || (self.is_parent() && other.parent() == self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a tracker's category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// The tracker's native code (numeric codes are stored as strings).
    pub native: String,
    /// The abstract category it maps to.
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryEntry {
    pub fn new(native: impl Into<String>, category: Category, desc: impl Into<String>) -> Self {
        Self {
            native: native.into(),
            category,
            description: Some(desc.into()),
        }
    }
}

/// Bidirectional, immutable mapping between native codes and abstract
/// categories.
///
/// The table may map one native code to several abstract categories and
/// several native codes to one abstract category.
#[derive(Debug, Clone, Default)]
pub struct CategoryMapper {
    entries: Vec<CategoryEntry>,
    by_native: HashMap<String, BTreeSet<Category>>,
}

impl CategoryMapper {
    pub fn new(entries: Vec<CategoryEntry>) -> Self {
        let mut by_native: HashMap<String, BTreeSet<Category>> = HashMap::new();
        for entry in &entries {
            by_native
                .entry(entry.native.clone())
                .or_default()
                .insert(entry.category);
        }
        Self { entries, by_native }
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve abstract categories to the de-duplicated set of native codes.
    ///
    /// Requesting a parent category includes every native code mapped to one
    /// of its subcategories.
    pub fn to_native(&self, categories: &[Category]) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|e| categories.iter().any(|c| c.covers(e.category)))
            .map(|e| e.native.clone())
            .collect()
    }

    /// Resolve a native code to its abstract categories.
    ///
    /// Unknown codes land in [`Category::UNCATEGORIZED`].
    pub fn to_abstract(&self, native: &str) -> BTreeSet<Category> {
        match self.by_native.get(native.trim()) {
            Some(cats) => cats.clone(),
            None => BTreeSet::from([Category::UNCATEGORIZED]),
        }
    }

    /// Whether the native code appears in the table.
    pub fn knows(&self, native: &str) -> bool {
        self.by_native.contains_key(native.trim())
    }
}
