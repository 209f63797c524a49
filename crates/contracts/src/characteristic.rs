//! CharacteristicUuid - Cheap-to-clone GATT characteristic identifier
//!
//! Uses Arc<str> internally for O(1) clone operations. The UUID text is
//! normalized to lowercase on construction so comparisons are case-insensitive.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Characteristic identifier with cheap cloning.
///
/// Devices and host stacks disagree on UUID letter case, so the value is
/// stored lowercased and every comparison is made against the lowercased form.
///
/// # Examples
/// ```
/// use contracts::CharacteristicUuid;
///
/// let id: CharacteristicUuid = "12345678-1234-1234-1234-1234567890AC".into();
/// assert_eq!(id, "12345678-1234-1234-1234-1234567890ac");
/// assert!(id.matches("12345678-1234-1234-1234-1234567890Ac"));
/// ```
#[derive(Clone, Default)]
pub struct CharacteristicUuid(Arc<str>);

impl CharacteristicUuid {
    /// Create a new identifier from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s.trim().to_ascii_lowercase()))
    }

    /// Get the normalized string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison with raw text
    #[inline]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl Deref for CharacteristicUuid {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for CharacteristicUuid {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CharacteristicUuid {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CharacteristicUuid {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CharacteristicUuid {
    #[inline]
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl fmt::Display for CharacteristicUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CharacteristicUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacteristicUuid({:?})", self.0)
    }
}

impl PartialEq for CharacteristicUuid {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for CharacteristicUuid {}

impl PartialEq<str> for CharacteristicUuid {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for CharacteristicUuid {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

impl Hash for CharacteristicUuid {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for CharacteristicUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CharacteristicUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
