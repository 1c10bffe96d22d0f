//! Raw queue record to view model projection.
//!
//! Every derived field goes through [`rules`]; the projection itself only
//! walks the optional record structure and hands values to those rules.

use chrono::{DateTime, Utc};

use super::types::{QueueResponse, QueueViewModel, RawQueueRecord};

/// Defaulting and relabeling rules, one function per derived field.
pub mod rules {
    use chrono::{DateTime, Utc};

    use crate::queue::format::{format_date, minutes_between, parse_date, FormatOptions};
    use crate::queue::types::{PLACEHOLDER, UNKNOWN_AGE};

    pub const URGENT_COMMENT: &str = "Urgent";
    pub const URGENT_LABEL: &str = "Priority";
    pub const MALE: &str = "MALE";
    pub const FEMALE: &str = "FEMALE";

    /// Minutes waited since `date_created`, or the placeholder.
    pub fn wait_time(date_created: Option<&str>, now: DateTime<Utc>) -> String {
        date_created
            .and_then(parse_date)
            .map(|created| minutes_between(&created, now).to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn priority_label(priority_comment: Option<&str>) -> Option<String> {
        match priority_comment {
            Some(URGENT_COMMENT) => Some(URGENT_LABEL.to_string()),
            other => other.map(str::to_string),
        }
    }

    /// Anything other than `"M"`, absent included, maps to `FEMALE`.
    pub fn sex_label(gender: Option<&str>) -> &'static str {
        match gender {
            Some("M") => MALE,
            _ => FEMALE,
        }
    }

    /// Date-only display of a server timestamp, or the placeholder.
    pub fn display_date(value: Option<&str>) -> String {
        value
            .and_then(parse_date)
            .map(|date| format_date(&date, FormatOptions::date_only()))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn age(age: Option<i64>) -> i64 {
        age.unwrap_or(UNKNOWN_AGE)
    }
}

/// Project records using the current wall-clock time for wait times.
pub fn project(records: &[RawQueueRecord]) -> Vec<QueueViewModel> {
    project_at(records, Utc::now())
}

/// Project records as of `now`. Order and length are preserved.
pub fn project_at(records: &[RawQueueRecord], now: DateTime<Utc>) -> Vec<QueueViewModel> {
    records.iter().map(|record| project_record(record, now)).collect()
}

/// Number of entries a payload projects to; zero when there is no payload.
pub fn count(response: Option<&QueueResponse>) -> usize {
    response.map_or(0, |r| r.results.len())
}

pub fn project_record(record: &RawQueueRecord, now: DateTime<Utc>) -> QueueViewModel {
    let patient = record.patient.as_ref();
    let person = patient.and_then(|p| p.person.as_ref());
    let location_from = record.location_from.as_ref();
    let location_to = record.location_to.as_ref();
    let creator = record.creator.as_ref();

    let identifiers = patient
        .and_then(|p| p.identifiers.clone())
        .or_else(|| record.identifiers.clone())
        .unwrap_or_default();

    QueueViewModel {
        id: record.uuid.clone(),
        name: person.and_then(|p| p.display.clone()),
        patient_age: rules::age(person.and_then(|p| p.age)),
        patient_sex: rules::sex_label(person.and_then(|p| p.gender.as_deref())).to_string(),
        patient_dob: rules::display_date(person.and_then(|p| p.birthdate.as_deref())),
        patient_uuid: patient.and_then(|p| p.uuid.clone()),
        priority: rules::priority_label(record.priority_comment.as_deref()),
        priority_comment: record.priority_comment.clone(),
        priority_level: record.priority.clone(),
        wait_time: rules::wait_time(record.date_created.as_deref(), now),
        status: record.status.clone(),
        location_from: location_from.and_then(|l| l.uuid.clone()),
        location_from_name: location_from.and_then(|l| l.name.clone()),
        location_to: location_to.and_then(|l| l.uuid.clone()),
        location_to_name: location_to.and_then(|l| l.name.clone()),
        queue_room: location_to.and_then(|l| l.display.clone()),
        visit_number: record.visit_number.clone(),
        identifiers,
        encounter: record.encounter.clone(),
        date_created: rules::display_date(record.date_created.as_deref()),
        creator_uuid: creator.and_then(|c| c.uuid.clone()),
        creator_username: creator.and_then(|c| c.username.clone()),
        creator_display: creator.and_then(|c| c.display.clone()),
    }
}
