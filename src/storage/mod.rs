mod file;
#[cfg(test)]
mod memory;

pub(crate) use file::FileStore;
#[cfg(test)]
pub(crate) use memory::MemoryStore;

/// Storage keys shared with the original browser client, kept stable so a
/// migration from exported localStorage data stays possible.
pub(crate) mod keys {
    pub(crate) const TOKEN: &str = "auth_token";
    pub(crate) const TOKEN_EXPIRY: &str = "auth_token_expiry";
    pub(crate) const USER_INFO: &str = "user_info";
    pub(crate) const GUEST_MODE: &str = "guest_mode";
    pub(crate) const BOOKMARKED_EXAMS: &str = "bookmarkedExams";
}

/// Small key/value persistence seam behind the auth session and bookmarks.
/// Mirrors the localStorage contract of the original client: reads never fail
/// (a broken backend reads as absent), writes are best-effort and logged.
pub(crate) trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}
