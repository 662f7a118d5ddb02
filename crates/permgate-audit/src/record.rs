//! Audit records.
//!
//! An [`AuditRecordInput`] is what a handler knows after its mutation
//! succeeded: who acted, which action, on which resource, from where. Sealing
//! it stamps the creation time and a random salt and derives the record id:
//!
//! ```text
//! id = BLAKE3(CBOR(domain, salt, user_id, action, resource_type,
//!                  resource_id, metadata, ip_address, user_agent, created_at))
//! ```
//!
//! A sealed [`AuditRecord`] has no setters.

use std::borrow::Cow;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use permgate_core::PrincipalId;

use crate::error::{AuditError, Result};

/// Domain separator mixed into every record id.
const ID_DOMAIN: &str = "permgate-audit-v1";

/// A stable, dot-namespaced action tag such as `apikey.deleted`.
///
/// External log consumers key on these strings. Renaming an existing one
/// needs a migration plan for every consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditAction(Cow<'static, str>);

impl AuditAction {
    pub const APIKEY_CREATED: AuditAction = AuditAction::from_static("apikey.created");
    pub const APIKEY_DELETED: AuditAction = AuditAction::from_static("apikey.deleted");
    pub const USER_CREATED: AuditAction = AuditAction::from_static("user.created");
    pub const USER_UPDATED: AuditAction = AuditAction::from_static("user.updated");
    pub const USER_DELETED: AuditAction = AuditAction::from_static("user.deleted");
    pub const USER_STATUS_CHANGED: AuditAction = AuditAction::from_static("user.status_changed");
    pub const ACADEMY_CONTENT_CREATED: AuditAction =
        AuditAction::from_static("academy.content.created");
    pub const ACADEMY_CONTENT_UPDATED: AuditAction =
        AuditAction::from_static("academy.content.updated");
    pub const ACADEMY_CONTENT_DELETED: AuditAction =
        AuditAction::from_static("academy.content.deleted");

    /// Use a string literal as an action.
    pub const fn from_static(action: &'static str) -> Self {
        Self(Cow::Borrowed(action))
    }

    /// Use an owned string as an action.
    pub fn new(action: impl Into<String>) -> Self {
        Self(Cow::Owned(action.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the action follows the `namespace.verb` convention:
    /// at least two dot-separated segments of `[a-z0-9_]`.
    pub fn is_namespaced(&self) -> bool {
        let mut segments = 0;
        for segment in self.0.split('.') {
            if segment.is_empty()
                || !segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
            {
                return false;
            }
            segments += 1;
        }
        segments >= 2
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for AuditAction {
    fn from(action: &'static str) -> Self {
        Self::from_static(action)
    }
}

/// A 32-byte audit record identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuditRecordId(pub [u8; 32]);

impl AuditRecordId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for AuditRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuditRecordId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for AuditRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl Serialize for AuditRecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AuditRecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AuditRecordId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// What a handler supplies to record an action.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordInput {
    /// The acting principal, if known.
    pub user_id: Option<PrincipalId>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    /// Free-form details, e.g. the name of a deleted key.
    pub metadata: Map<String, Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditRecordInput {
    pub fn new(action: AuditAction, resource_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            action,
            resource_type: resource_type.into(),
            resource_id: None,
            metadata: Map::new(),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn user(mut self, user_id: impl Into<PrincipalId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add one metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merge a metadata map; later keys win.
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Attach the origin of the request.
    pub fn origin(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// An immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    id: AuditRecordId,
    #[serde(with = "hex_salt")]
    salt: [u8; 16],
    user_id: Option<PrincipalId>,
    action: AuditAction,
    resource_type: String,
    resource_id: Option<String>,
    metadata: Map<String, Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: i64,
}

/// Borrowed view hashed to produce the record id.
#[derive(Serialize)]
struct CanonicalContent<'a> {
    domain: &'static str,
    salt: &'a [u8; 16],
    user_id: Option<&'a str>,
    action: &'a str,
    resource_type: &'a str,
    resource_id: Option<&'a str>,
    metadata: &'a Map<String, Value>,
    ip_address: Option<&'a str>,
    user_agent: Option<&'a str>,
    created_at: i64,
}

impl AuditRecord {
    /// Seal an input into a record created at `created_at` (Unix ms).
    pub fn seal(input: AuditRecordInput, created_at: i64) -> Result<Self> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::seal_with_salt(input, created_at, salt)
    }

    /// Seal with a caller-chosen salt. Deterministic; used by tests and
    /// by stores reconstructing rows.
    pub fn seal_with_salt(input: AuditRecordInput, created_at: i64, salt: [u8; 16]) -> Result<Self> {
        if input.action.as_str().is_empty() {
            return Err(AuditError::InvalidRecord("empty action".into()));
        }
        if input.resource_type.is_empty() {
            return Err(AuditError::InvalidRecord("empty resource type".into()));
        }
        if !input.action.is_namespaced() {
            tracing::warn!(action = %input.action, "audit action is not dot-namespaced");
        }

        let mut record = Self {
            id: AuditRecordId([0u8; 32]),
            salt,
            user_id: input.user_id,
            action: input.action,
            resource_type: input.resource_type,
            resource_id: input.resource_id,
            metadata: input.metadata,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            created_at,
        };
        record.id = record.compute_id()?;
        Ok(record)
    }

    /// Rebuild a stored record without re-deriving its id.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: AuditRecordId,
        salt: [u8; 16],
        user_id: Option<PrincipalId>,
        action: AuditAction,
        resource_type: String,
        resource_id: Option<String>,
        metadata: Map<String, Value>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            salt,
            user_id,
            action,
            resource_type,
            resource_id,
            metadata,
            ip_address,
            user_agent,
            created_at,
        }
    }

    /// Canonical CBOR encoding of the record content.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let content = CanonicalContent {
            domain: ID_DOMAIN,
            salt: &self.salt,
            user_id: self.user_id.as_ref().map(PrincipalId::as_str),
            action: self.action.as_str(),
            resource_type: &self.resource_type,
            resource_id: self.resource_id.as_deref(),
            metadata: &self.metadata,
            ip_address: self.ip_address.as_deref(),
            user_agent: self.user_agent.as_deref(),
            created_at: self.created_at,
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&content, &mut buf)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn compute_id(&self) -> Result<AuditRecordId> {
        let bytes = self.canonical_bytes()?;
        Ok(AuditRecordId(*blake3::hash(&bytes).as_bytes()))
    }

    /// Whether the stored id still matches the content.
    pub fn verify_id(&self) -> bool {
        matches!(self.compute_id(), Ok(id) if id == self.id)
    }

    /// Like [`verify_id`](Self::verify_id), as an error for stores to return.
    pub fn check_id(&self) -> Result<()> {
        if self.verify_id() {
            Ok(())
        } else {
            Err(AuditError::InvalidRecord(format!(
                "id {} does not match record content",
                self.id
            )))
        }
    }

    pub fn id(&self) -> AuditRecordId {
        self.id
    }

    pub fn salt(&self) -> &[u8; 16] {
        &self.salt
    }

    pub fn user_id(&self) -> Option<&PrincipalId> {
        self.user_id.as_ref()
    }

    pub fn action(&self) -> &AuditAction {
        &self.action
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Creation time, Unix milliseconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

mod hex_salt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(salt: &[u8; 16], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(salt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 16], D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut salt = [0u8; 16];
        hex::decode_to_slice(&s, &mut salt).map_err(serde::de::Error::custom)?;
        Ok(salt)
    }
}
