use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
}

/// Registered accounts, keyed by exact username.
///
/// Records are only ever added; there is no update or delete path.
#[derive(Default)]
pub struct UserStore {
    users: DashMap<String, UserRecord>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` unless the username is already taken.
    ///
    /// Returns `false` and leaves the existing record untouched on conflict.
    pub fn insert(&self, record: UserRecord) -> bool {
        match self.users.entry(record.username.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!("User already exists: {}", record.username);
                false
            }
            Entry::Vacant(slot) => {
                tracing::debug!("User stored: {}", record.username);
                slot.insert(record);
                true
            }
        }
    }

    pub fn find(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}
