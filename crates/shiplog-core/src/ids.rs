use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh identifier of the form `<prefix>_<unix-millis>_<8 hex>`.
///
/// Uniqueness comes from the clock plus 32 bits of a v4 uuid; nothing is
/// checked against existing ids.
pub fn new_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let entropy = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{millis}_{}", &entropy[..8])
}

/// Declare a string newtype id with a generator prefix.
macro_rules! string_id {
    ($T:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $T(pub String);

        impl $T {
            pub fn generate() -> Self {
                $T(new_id($prefix))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                $T(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                $T(s)
            }
        }

        impl std::fmt::Display for $T {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(NodeId, "node");
string_id!(EdgeId, "edge");
string_id!(ItemId, "item");
