use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: String,
    pub duration: String,
    pub max_bookings: u32,
}

impl TimeSlot {
    pub fn parsed_start_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: DayOfWeek,
    pub is_available: bool,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub is_unavailable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slots: Option<Vec<TimeSlot>>,
}

/// Singleton booking configuration, edited by admins and read on every
/// availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySettings {
    pub timezone: String,
    pub weekly_schedule: Vec<DaySchedule>,
    #[serde(default)]
    pub special_dates: Vec<SpecialDate>,
    pub advance_booking_days: u32,
    pub minimum_notice_hours: u32,
}

impl AvailabilitySettings {
    pub fn day_schedule(&self, day: DayOfWeek) -> Option<&DaySchedule> {
        self.weekly_schedule.iter().find(|entry| entry.day == day)
    }

    pub fn special_date(&self, date: NaiveDate) -> Option<&SpecialDate> {
        self.special_dates.iter().find(|entry| entry.date == date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    New,
    Confirmed,
    Completed,
    Cancelled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::New => "new",
            CallStatus::Confirmed => "confirmed",
            CallStatus::Completed => "completed",
            CallStatus::Cancelled => "cancelled",
        }
    }

    /// Every status except `cancelled` occupies a seat in its slot.
    pub fn holds_capacity(&self) -> bool {
        *self != CallStatus::Cancelled
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(CallStatus::New),
            "confirmed" => Ok(CallStatus::Confirmed),
            "completed" => Ok(CallStatus::Completed),
            "cancelled" => Ok(CallStatus::Cancelled),
            other => Err(format!("Unknown call status: {other}")),
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Consultation,
    Demo,
    Partnership,
    Other,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Consultation => "consultation",
            CallType::Demo => "demo",
            CallType::Partnership => "partnership",
            CallType::Other => "other",
        }
    }
}

impl FromStr for CallType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "consultation" => Ok(CallType::Consultation),
            "demo" => Ok(CallType::Demo),
            "partnership" => Ok(CallType::Partnership),
            "other" => Ok(CallType::Other),
            other => Err(format!("Unknown call type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCall {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub call_date: NaiveDate,
    pub time_slot: String,
    pub call_type: CallType,
    pub status: CallStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduledCall {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub call_date: NaiveDate,
    pub time_slot: String,
    pub call_type: CallType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: Uuid,
    pub version: String,
    pub release_date: NaiveDate,
    pub breaking_changes: bool,
    pub content: String,
    pub contributors: Option<String>,
    pub github_id: i64,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub version: String,
    pub release_date: NaiveDate,
    pub breaking_changes: bool,
    pub content: String,
    pub contributors: Option<String>,
    pub github_id: i64,
    pub last_synced_at: DateTime<Utc>,
}
