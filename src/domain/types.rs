//! Identifier newtypes and shared primitive types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 32-byte SHA-256 digest
pub type Hash256 = [u8; 32];

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

id_newtype!(
    /// Student identifier
    StudentId
);
id_newtype!(
    /// Subject (course) identifier
    SubjectId
);
id_newtype!(
    /// Faculty identifier
    FacultyId
);
id_newtype!(
    /// University identifier
    UniversityId
);
id_newtype!(
    /// Certificate identifier
    CertificateId
);
id_newtype!(
    /// Score record identifier
    ScoreId
);
id_newtype!(
    /// Verification code identifier
    VerificationCodeId
);

/// Serde module for serializing Hash256 as hex strings
pub mod hash256_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes for Hash256"))
    }
}

/// Serde module for optional Hash256 as hex strings
pub mod option_hash256_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(opt: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match opt {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) => {
                let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
                let arr = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes for Hash256"))?;
                Ok(Some(arr))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_matches_uuid() {
        let uuid = Uuid::parse_str("d982e688-bc8e-4cb3-ba26-b7777a98c526").unwrap();
        let id = StudentId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn hash256_hex_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "hash256_hex")]
            digest: Hash256,
        }

        let w = Wrapper { digest: [7u8; 32] };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains(&hex::encode([7u8; 32])));

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.digest, [7u8; 32]);
    }
}
