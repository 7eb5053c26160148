//! Account database lookup (uid -> user name).

use ahash::AHashMap as HashMap;
use tracing::debug;

use crate::source::{read_to_string_lossy, StatSource};

/// Placeholder shown when a process owner cannot be determined at all.
pub const UNKNOWN_USER: &str = "?";

/// User names keyed by numeric uid, read from a `name:password:uid:...`
/// account database.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    names: HashMap<u32, String>,
}

impl UserTable {
    /// Scans the account database of the source layout. An unreadable
    /// database gives an empty table; invalid UTF-8 in a field (legacy
    /// Latin-1 GECOS entries) does not affect the other accounts.
    pub fn load(source: &StatSource) -> Self {
        let path = &source.layout().passwd;
        match read_to_string_lossy(path) {
            Some(content) => {
                let table = Self::parse(&content);
                debug!("Loaded {} accounts from {}", table.len(), path.display());
                table
            }
            None => Self::default(),
        }
    }

    /// Builds the table from database text. The first entry for a uid wins;
    /// lines without a numeric uid field are skipped.
    pub fn parse(content: &str) -> Self {
        let mut names = HashMap::new();
        for line in content.lines() {
            let mut fields = line.split(':');
            let (Some(name), Some(_password), Some(uid)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if let Ok(uid) = uid.trim().parse::<u32>() {
                names.entry(uid).or_insert_with(|| name.to_string());
            }
        }
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, uid: u32) -> Option<&str> {
        self.names.get(&uid).map(String::as_str)
    }

    /// Display name for an owner: the account name, else the numeric uid,
    /// else [`UNKNOWN_USER`].
    pub fn display_name(&self, uid: Option<u32>) -> String {
        match uid {
            Some(uid) => self
                .get(uid)
                .map(str::to_string)
                .unwrap_or_else(|| uid.to_string()),
            None => UNKNOWN_USER.to_string(),
        }
    }
}
