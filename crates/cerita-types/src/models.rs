use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of upper-case string values as stored in SQLite and
/// sent on the wire.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// SISWA is a student, GURU a teacher. Teachers moderate comments and
    /// author announcements.
    Role, "role" {
        Student => "SISWA",
        Teacher => "GURU",
    }
);

string_enum!(
    /// Who may see a story or journal, and whether its author is shown.
    Privacy, "privacy" {
        Public => "PUBLIC",
        Anonymous => "ANONYMOUS",
        Private => "PRIVATE",
    }
);

string_enum!(
    ReactionType, "reaction type" {
        Hug => "PELUK",
        Understand => "MENGERTI",
        Cheer => "SEMANGAT",
    }
);

string_enum!(
    MoodType, "mood type" {
        Happy => "SENANG",
        Sad => "SEDIH",
        Stressed => "STRES",
        Calm => "TENANG",
        Anxious => "CEMAS",
        Angry => "MARAH",
    }
);

impl Role {
    pub fn is_teacher(&self) -> bool {
        matches!(self, Role::Teacher)
    }
}

impl Privacy {
    /// ANONYMOUS records hide their author when rendered.
    pub fn masks_author(&self) -> bool {
        matches!(self, Privacy::Anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_values() {
        assert_eq!("GURU".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("ANONYMOUS".parse::<Privacy>().unwrap(), Privacy::Anonymous);
        assert_eq!("MENGERTI".parse::<ReactionType>().unwrap(), ReactionType::Understand);
        assert_eq!("CEMAS".parse::<MoodType>().unwrap(), MoodType::Anxious);
    }

    #[test]
    fn rejects_unknown_and_lowercase() {
        let err = "guru".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert!("SENANG ".parse::<MoodType>().is_err());
    }

    #[test]
    fn serde_uses_upper_case_names() {
        let json = serde_json::to_string(&Privacy::Private).unwrap();
        assert_eq!(json, "\"PRIVATE\"");
        let role: Role = serde_json::from_str("\"SISWA\"").unwrap();
        assert_eq!(role, Role::Student);
    }
}
