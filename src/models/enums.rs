//! Text backed domain enums shared by the database and the API

use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres,
};
use utoipa::ToSchema;

/// Declares an enum stored as `VARCHAR` and exchanged as the same text on the wire.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:tt),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                $(#[$vmeta])*
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

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<'r, Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Member account state
    MemberStatus {
        Active => "Active",
        Inactive => "Inactive",
        Suspended => "Suspended",
    }
}

text_enum! {
    /// Counter staff account state
    AdminStatus {
        Active => "Active",
        Inactive => "Inactive",
    }
}

text_enum! {
    /// Shelf state of a physical copy
    CopyStatus {
        Available => "Available",
        Borrowed => "Borrowed",
        Reserved => "Reserved",
        Lost => "Lost",
    }
}

text_enum! {
    /// Physical condition of a copy, ordered from best to worst
    BookCondition {
        Good => "Good",
        Fair => "Fair",
        Poor => "Poor",
    }
}

text_enum! {
    ReservationStatus {
        Active => "Active",
        Fulfilled => "Fulfilled",
        Cancelled => "Cancelled",
    }
}

text_enum! {
    /// Kind of additional fee attached to a loan item
    FeeKind {
        Overdue => "overdue",
        Lost => "lost",
        Renew => "renew",
        DamageGoodToFair => "damage_good_to_fair",
        DamageGoodToPoor => "damage_good_to_poor",
        DamageFairToPoor => "damage_fair_to_poor",
    }
}

impl BookCondition {
    /// 0 for Good, larger is worse
    pub fn wear(&self) -> u8 {
        match self {
            BookCondition::Good => 0,
            BookCondition::Fair => 1,
            BookCondition::Poor => 2,
        }
    }
}

impl FeeKind {
    pub fn is_damage(&self) -> bool {
        matches!(
            self,
            FeeKind::DamageGoodToFair | FeeKind::DamageGoodToPoor | FeeKind::DamageFairToPoor
        )
    }
}

/// Role carried in access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        for status in CopyStatus::ALL {
            assert_eq!(status.as_str().parse::<CopyStatus>().unwrap(), *status);
        }
        for kind in FeeKind::ALL {
            assert_eq!(kind.to_string().parse::<FeeKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_wrong_case() {
        assert!("Broken".parse::<BookCondition>().is_err());
        assert!("good".parse::<BookCondition>().is_err());
        assert!("OVERDUE".parse::<FeeKind>().is_err());
    }

    #[test]
    fn test_serde_uses_database_text() {
        assert_eq!(
            serde_json::to_value(FeeKind::DamageGoodToPoor).unwrap(),
            "damage_good_to_poor"
        );
        let status: MemberStatus = serde_json::from_str("\"Suspended\"").unwrap();
        assert_eq!(status, MemberStatus::Suspended);
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    }

    #[test]
    fn test_condition_wear_order() {
        assert!(BookCondition::Good.wear() < BookCondition::Fair.wear());
        assert!(BookCondition::Fair.wear() < BookCondition::Poor.wear());
    }

    #[test]
    fn test_damage_kinds() {
        assert!(FeeKind::DamageFairToPoor.is_damage());
        assert!(!FeeKind::Overdue.is_damage());
        assert!(!FeeKind::Renew.is_damage());
    }
}
