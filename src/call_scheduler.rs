use crate::{
    availability::{check_availability, parse_timezone},
    backend::BookingBackend,
    error::{AvailabilityError, ScheduleError},
    revalidate::Revalidator,
    types::{CallType, NewScheduledCall, ScheduledCall},
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

pub const CONTACT_PAGE: &str = "/contact";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCallRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub call_date: NaiveDate,
    #[validate(length(min = 1))]
    pub time_slot: String,
    pub call_type: CallType,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Books `request.time_slot` on `request.call_date`.
///
/// Availability is re-evaluated here rather than trusted from an earlier
/// read, and the insert itself is capacity-guarded by the backend, so two
/// concurrent requests can never exceed a slot's `maxBookings`.
pub fn schedule_call<B: BookingBackend>(
    backend: &B,
    revalidator: &Revalidator,
    request: ScheduleCallRequest,
    now: DateTime<Utc>,
) -> Result<ScheduledCall, ScheduleError> {
    let settings = backend
        .availability_settings()?
        .ok_or(AvailabilityError::SettingsMissing)?;
    let tz = parse_timezone(&settings.timezone)
        .ok_or_else(|| AvailabilityError::InvalidTimezone(settings.timezone.clone()))?;

    let start = NaiveTime::parse_from_str(&request.time_slot, "%H:%M")
        .map_err(|_| ScheduleError::UnknownSlot(request.time_slot.clone()))?;
    let slot_start = tz
        .from_local_datetime(&request.call_date.and_time(start))
        .earliest()
        .ok_or_else(|| ScheduleError::UnknownSlot(request.time_slot.clone()))?
        .with_timezone(&Utc);

    let availability = check_availability(backend, slot_start, now)?;
    if availability.is_booked(&request.time_slot) {
        return Err(ScheduleError::SlotFullyBooked);
    }
    let max_bookings = availability
        .offered_slot(&request.time_slot)
        .map(|slot| slot.max_bookings)
        .ok_or_else(|| ScheduleError::UnknownSlot(request.time_slot.clone()))?;

    let call = backend.insert_call_within_capacity(
        NewScheduledCall {
            full_name: request.full_name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone.filter(|phone| !phone.trim().is_empty()),
            call_date: request.call_date,
            time_slot: request.time_slot,
            call_type: request.call_type,
            notes: request.notes.filter(|notes| !notes.trim().is_empty()),
        },
        max_bookings,
    )?;
    info!(call_id = %call.id, date = %call.call_date, slot = %call.time_slot, "Scheduled call");

    revalidator.revalidate_path(CONTACT_PAGE);
    Ok(call)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        testutils::{published_paths, sample_settings, MockBackend},
        types::CallStatus,
    };
    use std::sync::atomic::Ordering;

    // Monday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 4, 8, 0, 0).unwrap()
    }

    fn request(day: u32, time_slot: &str) -> ScheduleCallRequest {
        ScheduleCallRequest {
            full_name: " Ada Lovelace ".into(),
            email: "ada@example.com".into(),
            phone: Some("".into()),
            call_date: NaiveDate::from_ymd_opt(2030, 3, day).unwrap(),
            time_slot: time_slot.into(),
            call_type: CallType::Demo,
            notes: Some("Plugin questions".into()),
        }
    }

    #[test]
    fn test_schedule_call() {
        let backend = MockBackend::with_settings(sample_settings());
        let revalidator = Revalidator::default();
        let mut revalidations = revalidator.subscribe();

        let call = schedule_call(&backend, &revalidator, request(6, "10:00"), now()).unwrap();
        assert_eq!(call.full_name, "Ada Lovelace");
        assert_eq!(call.status, CallStatus::New);
        assert_eq!(call.phone, None);
        assert_eq!(call.notes.as_deref(), Some("Plugin questions"));
        assert_eq!(published_paths(&mut revalidations), vec![CONTACT_PAGE]);
        assert_eq!(backend.0.calls_to_insert_call.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_booked_slot_is_rejected_without_insert() {
        let backend = MockBackend::with_settings(sample_settings());
        let revalidator = Revalidator::default();

        schedule_call(&backend, &revalidator, request(6, "10:00"), now()).unwrap();
        let err = schedule_call(&backend, &revalidator, request(6, "10:00"), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::SlotFullyBooked));
        assert_eq!(backend.0.calls_to_insert_call.load(Ordering::SeqCst), 1);

        // 14:00 takes two bookings
        schedule_call(&backend, &revalidator, request(6, "14:00"), now()).unwrap();
        schedule_call(&backend, &revalidator, request(6, "14:00"), now()).unwrap();
        let err = schedule_call(&backend, &revalidator, request(6, "14:00"), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::SlotFullyBooked));
    }

    #[test_case::test_case(6, "11:00" ; "slot not configured")]
    #[test_case::test_case(6, "eleven" ; "slot not a time")]
    #[test_case::test_case(9, "10:00" ; "closed weekday")]
    fn test_unknown_slot(day: u32, time_slot: &str) {
        let backend = MockBackend::with_settings(sample_settings());
        let revalidator = Revalidator::default();
        let mut revalidations = revalidator.subscribe();

        let err = schedule_call(&backend, &revalidator, request(day, time_slot), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownSlot(_)));
        assert_eq!(backend.0.calls_to_insert_call.load(Ordering::SeqCst), 0);
        assert!(published_paths(&mut revalidations).is_empty());
    }

    #[test]
    fn test_notice_is_checked_against_slot_start() {
        let backend = MockBackend::with_settings(sample_settings());
        let revalidator = Revalidator::default();

        // Tuesday 10:00 is 26 hours out, Monday 14:00 only six.
        schedule_call(&backend, &revalidator, request(5, "10:00"), now()).unwrap();
        let err = schedule_call(&backend, &revalidator, request(4, "14:00"), now()).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Availability(AvailabilityError::InsufficientNotice(24))
        ));
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let backend = MockBackend::with_settings(sample_settings());
        backend.0.success.store(false, Ordering::SeqCst);
        let revalidator = Revalidator::default();

        let err = schedule_call(&backend, &revalidator, request(6, "10:00"), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::Backend(_)));
    }

    #[test]
    fn test_request_validation() {
        request(6, "10:00").validate().unwrap();

        let mut invalid = request(6, "10:00");
        invalid.email = "not-an-email".into();
        assert!(invalid.validate().is_err());

        let mut invalid = request(6, "10:00");
        invalid.full_name = String::new();
        assert!(invalid.validate().is_err());
    }
}
