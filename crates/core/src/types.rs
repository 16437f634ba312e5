/// User identities are opaque strings (UUIDs in practice, but nothing in
/// the protocol depends on that).
pub type Identity = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
