//! Text-backed enums stored in `TEXT` columns guarded by `CHECK` constraints.
//!
//! Each variant maps to exactly one lowercase database literal. Repositories
//! bind `as_str()` and models parse rows back with `FromStr`, so the Rust
//! enum and the migration's `CHECK (... IN (...))` list must stay in sync.

use std::fmt;
use std::str::FromStr;

/// Error returned when a database or request literal does not match any
/// variant of a text enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database literal for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_text_enum! {
    /// Kind of background work a job performs.
    JobType ("job type") {
        Export = "export",
        Email = "email",
        Report = "report",
    }
}

define_text_enum! {
    /// Job lifecycle: `queued -> started -> completed | error`.
    JobStatus ("job status") {
        Queued = "queued",
        Started = "started",
        Completed = "completed",
        Error = "error",
    }
}

define_text_enum! {
    /// Role granted to the invitee once the invite is accepted.
    InviteRole ("invite role") {
        Member = "member",
        Admin = "admin",
    }
}

define_text_enum! {
    /// Invite lifecycle. Only `pending` invites can transition.
    InviteStatus ("invite status") {
        Pending = "pending",
        Accepted = "accepted",
        Declined = "declined",
        Expired = "expired",
    }
}
