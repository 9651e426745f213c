use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{NaiveDate, TimeZone, Utc};
use futures::{FutureExt, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{
    backend::{BookingBackend, ReleaseBackend},
    error::BackendError,
    local_store::LocalStore,
    revalidate::Revalidation,
    types::{
        AvailabilitySettings, CallType, DayOfWeek, DaySchedule, NewRelease, NewScheduledCall,
        Release, ScheduledCall, TimeSlot,
    },
};

pub fn slot(start_time: &str, max_bookings: u32) -> TimeSlot {
    TimeSlot {
        start_time: start_time.into(),
        duration: "30 minutes".into(),
        max_bookings,
    }
}

/// Weekdays open with a single-seat 10:00 slot and a two-seat 14:00 slot,
/// weekends closed. Times are UTC.
pub fn sample_settings() -> AvailabilitySettings {
    let weekdays = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];
    let mut weekly_schedule: Vec<DaySchedule> = weekdays
        .into_iter()
        .map(|day| DaySchedule {
            day,
            is_available: true,
            time_slots: vec![slot("10:00", 1), slot("14:00", 2)],
        })
        .collect();
    for day in [DayOfWeek::Saturday, DayOfWeek::Sunday] {
        weekly_schedule.push(DaySchedule {
            day,
            is_available: false,
            time_slots: vec![],
        });
    }

    AvailabilitySettings {
        timezone: "UTC".into(),
        weekly_schedule,
        special_dates: vec![],
        advance_booking_days: 30,
        minimum_notice_hours: 24,
    }
}

pub fn new_call(call_date: NaiveDate, time_slot: &str, full_name: &str) -> NewScheduledCall {
    NewScheduledCall {
        full_name: full_name.into(),
        email: "caller@example.com".into(),
        phone: None,
        call_date,
        time_slot: time_slot.into(),
        call_type: CallType::Consultation,
        notes: None,
    }
}

pub fn new_release(version: &str, (year, month, day): (i32, u32, u32)) -> NewRelease {
    NewRelease {
        version: version.into(),
        release_date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
        breaking_changes: false,
        content: format!("## {version}\n\n### 🐛 Bug Fixes\n\n* something"),
        contributors: None,
        github_id: 1,
        last_synced_at: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
    }
}

/// Paths already waiting on `stream`, without blocking for more.
pub fn published_paths(stream: &mut BroadcastStream<Revalidation>) -> Vec<String> {
    let mut paths = vec![];
    while let Some(Some(Ok(revalidation))) = stream.next().now_or_never() {
        paths.push(revalidation.path);
    }
    paths
}

pub struct MockBackendInner {
    pub success: AtomicBool,
    pub calls_to_availability_settings: AtomicU64,
    pub calls_to_save_availability_settings: AtomicU64,
    pub calls_to_insert_call: AtomicU64,
    pub calls_to_scheduled_calls: AtomicU64,
    pub calls_to_cancel_call: AtomicU64,
    pub calls_to_insert_release: AtomicU64,
    pub calls_to_releases: AtomicU64,
    pub store: LocalStore,
}

/// Wraps a real `LocalStore`, counts calls and can be switched to fail.
#[derive(Clone)]
pub struct MockBackend(pub Arc<MockBackendInner>);

impl MockBackendInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            calls_to_availability_settings: AtomicU64::default(),
            calls_to_save_availability_settings: AtomicU64::default(),
            calls_to_insert_call: AtomicU64::default(),
            calls_to_scheduled_calls: AtomicU64::default(),
            calls_to_cancel_call: AtomicU64::default(),
            calls_to_insert_release: AtomicU64::default(),
            calls_to_releases: AtomicU64::default(),
            store: LocalStore::default(),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockBackendInner::new()))
    }

    pub fn with_settings(settings: AvailabilitySettings) -> Self {
        let backend = Self::new();
        backend.0.store.save_availability_settings(settings).unwrap();
        backend
    }

    fn result(&self) -> Result<(), BackendError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(BackendError::Unavailable("Supposed to fail".into())),
        }
    }
}

impl BookingBackend for MockBackend {
    fn availability_settings(&self) -> Result<Option<AvailabilitySettings>, BackendError> {
        self.0
            .calls_to_availability_settings
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.availability_settings()
    }

    fn save_availability_settings(
        &self,
        settings: AvailabilitySettings,
    ) -> Result<(), BackendError> {
        self.0
            .calls_to_save_availability_settings
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.save_availability_settings(settings)
    }

    fn active_calls_on(&self, date: NaiveDate) -> Result<Vec<ScheduledCall>, BackendError> {
        self.result()?;
        self.0.store.active_calls_on(date)
    }

    fn insert_call_within_capacity(
        &self,
        call: NewScheduledCall,
        max_bookings: u32,
    ) -> Result<ScheduledCall, BackendError> {
        self.0.calls_to_insert_call.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.insert_call_within_capacity(call, max_bookings)
    }

    fn scheduled_calls(&self) -> Result<Vec<ScheduledCall>, BackendError> {
        self.0.calls_to_scheduled_calls.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.scheduled_calls()
    }

    fn cancel_call(&self, id: Uuid) -> Result<ScheduledCall, BackendError> {
        self.0.calls_to_cancel_call.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.cancel_call(id)
    }
}

impl ReleaseBackend for MockBackend {
    fn release_versions(&self) -> Result<HashSet<String>, BackendError> {
        self.result()?;
        self.0.store.release_versions()
    }

    fn insert_release(&self, release: NewRelease) -> Result<bool, BackendError> {
        self.0.calls_to_insert_release.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.insert_release(release)
    }

    fn releases(&self, limit: usize) -> Result<Vec<Release>, BackendError> {
        self.0.calls_to_releases.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.releases(limit)
    }

    fn release(&self, version: &str) -> Result<Option<Release>, BackendError> {
        self.result()?;
        self.0.store.release(version)
    }
}
