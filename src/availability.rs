use crate::{
    backend::BookingBackend,
    error::{AvailabilityError, SettingsError},
    types::{AvailabilitySettings, DayOfWeek, ScheduledCall, TimeSlot},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const SPECIAL_DATE_CLOSED_MESSAGE: &str = "This date is not available for booking";
const DAY_CLOSED_MESSAGE: &str = "No availability on this day";
const NO_SLOTS_MESSAGE: &str = "No time slots configured for this day";

pub const MAX_ADVANCE_BOOKING_DAYS: u32 = 3650;
pub const MAX_MINIMUM_NOTICE_HOURS: u32 = 8760;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableSlot {
    pub time: String,
    pub duration: String,
}

/// Why a day offers the slots it does. Lets callers tell a closed day apart
/// from one that simply has nothing configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AvailabilityReason {
    Open,
    SpecialDateClosed,
    DayClosed,
    NoSlotsConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAvailability {
    /// Calendar day in the configured timezone.
    pub date: NaiveDate,
    pub reason: AvailabilityReason,
    pub message: Option<String>,
    pub available_slots: Vec<AvailableSlot>,
    pub booked_slots: Vec<String>,
    /// Every slot configured for the day, booked or not.
    pub offered: Vec<TimeSlot>,
}

impl DayAvailability {
    fn closed(date: NaiveDate, reason: AvailabilityReason, message: String) -> Self {
        Self {
            date,
            reason,
            message: Some(message),
            available_slots: vec![],
            booked_slots: vec![],
            offered: vec![],
        }
    }

    pub fn offered_slot(&self, start_time: &str) -> Option<&TimeSlot> {
        self.offered.iter().find(|slot| slot.start_time == start_time)
    }

    pub fn is_booked(&self, start_time: &str) -> bool {
        self.booked_slots.iter().any(|booked| booked == start_time)
    }
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

/// Rejects settings that would make availability checks ambiguous or
/// impossible to evaluate.
pub fn validate_settings(settings: &AvailabilitySettings) -> Result<(), SettingsError> {
    if parse_timezone(&settings.timezone).is_none() {
        return Err(SettingsError::InvalidTimezone(settings.timezone.clone()));
    }

    if settings.advance_booking_days > MAX_ADVANCE_BOOKING_DAYS {
        return Err(SettingsError::WindowOutOfRange {
            field: "advanceBookingDays",
            max: MAX_ADVANCE_BOOKING_DAYS,
        });
    }
    if settings.minimum_notice_hours > MAX_MINIMUM_NOTICE_HOURS {
        return Err(SettingsError::WindowOutOfRange {
            field: "minimumNoticeHours",
            max: MAX_MINIMUM_NOTICE_HOURS,
        });
    }

    let days: HashSet<DayOfWeek> = settings.weekly_schedule.iter().map(|d| d.day).collect();
    if settings.weekly_schedule.len() != 7 || days.len() != 7 {
        return Err(SettingsError::IncompleteWeek);
    }

    for day in &settings.weekly_schedule {
        validate_slots(&day.time_slots)?;
    }

    let mut seen_dates = HashSet::new();
    for special in &settings.special_dates {
        if !seen_dates.insert(special.date) {
            return Err(SettingsError::DuplicateSpecialDate(special.date));
        }
        if let Some(slots) = &special.time_slots {
            validate_slots(slots)?;
        }
    }
    Ok(())
}

fn validate_slots(slots: &[TimeSlot]) -> Result<(), SettingsError> {
    let mut seen = HashSet::new();
    for slot in slots {
        if slot.parsed_start_time().is_none() {
            return Err(SettingsError::InvalidStartTime(slot.start_time.clone()));
        }
        if slot.max_bookings == 0 {
            return Err(SettingsError::ZeroCapacity(slot.start_time.clone()));
        }
        if !seen.insert(slot.start_time.as_str()) {
            return Err(SettingsError::DuplicateSlot(slot.start_time.clone()));
        }
    }
    Ok(())
}

enum DaySlots {
    Open(Vec<TimeSlot>),
    Closed(AvailabilityReason, String),
}

/// Picks the slot list for `day`: a special-date override wins over the
/// weekly schedule.
fn slots_for_day(settings: &AvailabilitySettings, day: NaiveDate) -> DaySlots {
    if let Some(special) = settings.special_date(day) {
        if special.is_unavailable {
            let message = special
                .note
                .clone()
                .filter(|note| !note.trim().is_empty())
                .unwrap_or_else(|| SPECIAL_DATE_CLOSED_MESSAGE.into());
            return DaySlots::Closed(AvailabilityReason::SpecialDateClosed, message);
        }
        if let Some(slots) = &special.time_slots {
            return DaySlots::Open(slots.clone());
        }
    }

    match settings.day_schedule(DayOfWeek::from(day.weekday())) {
        Some(schedule) if schedule.is_available => DaySlots::Open(schedule.time_slots.clone()),
        _ => DaySlots::Closed(AvailabilityReason::DayClosed, DAY_CLOSED_MESSAGE.into()),
    }
}

/// Splits `slots` into bookable ones and start times that reached their cap.
pub fn partition_slots(
    slots: &[TimeSlot],
    calls: &[ScheduledCall],
) -> (Vec<AvailableSlot>, Vec<String>) {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for call in calls.iter().filter(|call| call.status.holds_capacity()) {
        *counts.entry(call.time_slot.as_str()).or_default() += 1;
    }

    let mut available_slots = vec![];
    let mut booked_slots = vec![];
    for slot in slots {
        let booked = counts.get(slot.start_time.as_str()).copied().unwrap_or(0);
        if booked >= slot.max_bookings {
            booked_slots.push(slot.start_time.clone());
        } else {
            available_slots.push(AvailableSlot {
                time: slot.start_time.clone(),
                duration: slot.duration.clone(),
            });
        }
    }
    (available_slots, booked_slots)
}

/// Earliest and latest bookable instants relative to `now`.
fn booking_window(
    settings: &AvailabilitySettings,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AvailabilityError> {
    let shift = |delta: Option<Duration>| delta.and_then(|delta| now.checked_add_signed(delta));
    let earliest = shift(Duration::try_hours(i64::from(settings.minimum_notice_hours)));
    let latest = shift(Duration::try_days(i64::from(settings.advance_booking_days)));
    earliest
        .zip(latest)
        .ok_or(AvailabilityError::WindowOutOfRange {
            advance_booking_days: settings.advance_booking_days,
            minimum_notice_hours: settings.minimum_notice_hours,
        })
}

/// Computes the bookable slots for the day `date` falls on in the
/// configured timezone.
pub fn check_availability<B: BookingBackend>(
    backend: &B,
    date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DayAvailability, AvailabilityError> {
    let settings = backend
        .availability_settings()?
        .ok_or(AvailabilityError::SettingsMissing)?;
    let tz = parse_timezone(&settings.timezone)
        .ok_or_else(|| AvailabilityError::InvalidTimezone(settings.timezone.clone()))?;
    let day = date.with_timezone(&tz).date_naive();

    let (earliest, latest) = booking_window(&settings, now)?;
    if date > latest {
        return Err(AvailabilityError::TooFarInAdvance(settings.advance_booking_days));
    }
    if date < earliest {
        return Err(AvailabilityError::InsufficientNotice(
            settings.minimum_notice_hours,
        ));
    }

    let mut slots = match slots_for_day(&settings, day) {
        DaySlots::Closed(reason, message) => {
            return Ok(DayAvailability::closed(day, reason, message))
        }
        DaySlots::Open(slots) if slots.is_empty() => {
            return Ok(DayAvailability::closed(
                day,
                AvailabilityReason::NoSlotsConfigured,
                NO_SLOTS_MESSAGE.into(),
            ))
        }
        DaySlots::Open(slots) => slots,
    };
    slots.sort_by_key(|slot| slot.parsed_start_time());

    let calls = backend.active_calls_on(day)?;
    let (available_slots, booked_slots) = partition_slots(&slots, &calls);

    Ok(DayAvailability {
        date: day,
        reason: AvailabilityReason::Open,
        message: None,
        available_slots,
        booked_slots,
        offered: slots,
    })
}
