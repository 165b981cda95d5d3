//! The token carried in the auth cookie and how it is (de)serialized.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::UserID;

mod datetime_format {
    //! Serializes a [time::OffsetDateTime] in a custom format that survives
    //! midnight.
    //!
    //! The default serializer for [time::OffsetDateTime] will serialize
    //! "00:00:00.000000" as "0:00:00.0" and the deserializer would error out
    //! because it expects the hours to be two digits, not one.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the token expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The signed-in user named by the auth cookie, plus when the claim stops
/// being valid.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    /// The user the cookie signs in.
    pub user_id: UserID,

    /// When the token stops being accepted, regardless of what the cookie's
    /// own expiry says.
    #[serde(
        serialize_with = "datetime_format::serialize",
        deserialize_with = "datetime_format::deserialize"
    )]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Whether the token has expired as of `now`.
    pub fn has_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}
