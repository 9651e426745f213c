use crate::{
    backend::{BookingBackend, ReleaseBackend},
    error::BackendError,
    types::{AvailabilitySettings, CallStatus, NewRelease, NewScheduledCall, Release, ScheduledCall},
};
use chrono::{NaiveDate, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Store {
    settings: Option<AvailabilitySettings>,
    calls: HashMap<Uuid, ScheduledCall>,
    releases: HashMap<String, Release>,
}

/// Non-persistent backend used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    store: Arc<Mutex<Store>>,
}

impl LocalStore {
    fn lock(&self) -> Result<MutexGuard<'_, Store>, BackendError> {
        self.store
            .lock()
            .map_err(|_| BackendError::Unavailable("local store lock poisoned".into()))
    }
}

impl BookingBackend for LocalStore {
    fn availability_settings(&self) -> Result<Option<AvailabilitySettings>, BackendError> {
        Ok(self.lock()?.settings.clone())
    }

    fn save_availability_settings(
        &self,
        settings: AvailabilitySettings,
    ) -> Result<(), BackendError> {
        self.lock()?.settings = Some(settings);
        Ok(())
    }

    fn active_calls_on(&self, date: NaiveDate) -> Result<Vec<ScheduledCall>, BackendError> {
        Ok(self
            .lock()?
            .calls
            .values()
            .filter(|call| call.call_date == date && call.status.holds_capacity())
            .cloned()
            .collect())
    }

    fn insert_call_within_capacity(
        &self,
        call: NewScheduledCall,
        max_bookings: u32,
    ) -> Result<ScheduledCall, BackendError> {
        let mut store = self.lock()?;

        let booked = store
            .calls
            .values()
            .filter(|existing| {
                existing.call_date == call.call_date
                    && existing.time_slot == call.time_slot
                    && existing.status.holds_capacity()
            })
            .count();
        if booked >= max_bookings as usize {
            return Err(BackendError::SlotFull);
        }

        let now = Utc::now();
        let scheduled = ScheduledCall {
            id: Uuid::new_v4(),
            full_name: call.full_name,
            email: call.email,
            phone: call.phone,
            call_date: call.call_date,
            time_slot: call.time_slot,
            call_type: call.call_type,
            status: CallStatus::New,
            notes: call.notes,
            created_at: now,
            updated_at: now,
        };
        store.calls.insert(scheduled.id, scheduled.clone());
        Ok(scheduled)
    }

    fn scheduled_calls(&self) -> Result<Vec<ScheduledCall>, BackendError> {
        let mut calls: Vec<ScheduledCall> = self.lock()?.calls.values().cloned().collect();
        calls.sort_unstable_by(|a, b| {
            b.call_date
                .cmp(&a.call_date)
                .then_with(|| a.time_slot.cmp(&b.time_slot))
        });
        Ok(calls)
    }

    fn cancel_call(&self, id: Uuid) -> Result<ScheduledCall, BackendError> {
        let mut store = self.lock()?;
        match store.calls.get_mut(&id) {
            Some(call) => {
                if call.status != CallStatus::Cancelled {
                    call.status = CallStatus::Cancelled;
                    call.updated_at = Utc::now();
                }
                Ok(call.clone())
            }
            None => Err(BackendError::CallNotFound(id)),
        }
    }
}

impl ReleaseBackend for LocalStore {
    fn release_versions(&self) -> Result<HashSet<String>, BackendError> {
        Ok(self.lock()?.releases.keys().cloned().collect())
    }

    fn insert_release(&self, release: NewRelease) -> Result<bool, BackendError> {
        let mut store = self.lock()?;
        if store.releases.contains_key(&release.version) {
            return Ok(false);
        }
        store.releases.insert(
            release.version.clone(),
            Release {
                id: Uuid::new_v4(),
                version: release.version,
                release_date: release.release_date,
                breaking_changes: release.breaking_changes,
                content: release.content,
                contributors: release.contributors,
                github_id: release.github_id,
                last_synced_at: release.last_synced_at,
            },
        );
        Ok(true)
    }

    fn releases(&self, limit: usize) -> Result<Vec<Release>, BackendError> {
        let mut releases: Vec<Release> = self.lock()?.releases.values().cloned().collect();
        releases.sort_unstable_by(|a, b| {
            b.release_date
                .cmp(&a.release_date)
                .then_with(|| b.version.cmp(&a.version))
        });
        releases.truncate(limit);
        Ok(releases)
    }

    fn release(&self, version: &str) -> Result<Option<Release>, BackendError> {
        Ok(self.lock()?.releases.get(version).cloned())
    }
}
