//! Patient queue record types as returned by the server, and the
//! display-ready view model projected from them.

use super::lenient;
use serde::{Deserialize, Serialize};

/// Shown wherever a date or wait time cannot be derived.
pub const PLACEHOLDER: &str = "--";

/// Age reported when the person record carries none.
pub const UNKNOWN_AGE: i64 = -1;

/// A `{ uuid, display }` pair, used for patient identifiers and encounters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UuidDisplay {
    #[serde(deserialize_with = "lenient::string")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    #[serde(deserialize_with = "lenient::string")]
    pub display: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub age: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub gender: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub birthdate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    #[serde(deserialize_with = "lenient::string")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub person: Option<Person>,
    #[serde(deserialize_with = "lenient::list")]
    pub identifiers: Option<Vec<UuidDisplay>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRef {
    #[serde(deserialize_with = "lenient::string")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Creator {
    #[serde(deserialize_with = "lenient::string")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub username: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub display: Option<String>,
}

/// One queue entry as the server sends it. Nothing is guaranteed present, and
/// a field of the wrong JSON type decodes as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawQueueRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub patient: Option<Patient>,
    #[serde(deserialize_with = "lenient::string")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub priority_comment: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub date_created: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub location_from: Option<LocationRef>,
    #[serde(deserialize_with = "lenient::object")]
    pub location_to: Option<LocationRef>,
    #[serde(deserialize_with = "lenient::string")]
    pub visit_number: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub creator: Option<Creator>,
    #[serde(deserialize_with = "lenient::list")]
    pub identifiers: Option<Vec<UuidDisplay>>,
    #[serde(deserialize_with = "lenient::object")]
    pub encounter: Option<UuidDisplay>,
}

/// Body of `GET .../patientqueue`. A null or malformed `results` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueResponse {
    #[serde(deserialize_with = "lenient::list_or_empty")]
    pub results: Vec<RawQueueRecord>,
}

/// Display-ready projection of a [`RawQueueRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueViewModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub patient_age: i64,
    pub patient_sex: String,
    pub patient_dob: String,
    pub patient_uuid: Option<String>,
    /// Business label; `"Urgent"` comments are shown as `"Priority"`.
    pub priority: Option<String>,
    pub priority_comment: Option<String>,
    pub priority_level: Option<String>,
    pub wait_time: String,
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_from_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_to_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_room: Option<String>,
    pub visit_number: Option<String>,
    pub identifiers: Vec<UuidDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<UuidDisplay>,
    pub date_created: String,
    pub creator_uuid: Option<String>,
    pub creator_username: Option<String>,
    pub creator_display: Option<String>,
}
