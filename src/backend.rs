use crate::{
    error::BackendError,
    types::{AvailabilitySettings, NewRelease, NewScheduledCall, Release, ScheduledCall},
};
use chrono::NaiveDate;
use std::collections::HashSet;
use uuid::Uuid;

pub trait BookingBackend: Clone + Send + Sync + 'static {
    fn availability_settings(&self) -> Result<Option<AvailabilitySettings>, BackendError>;
    fn save_availability_settings(&self, settings: AvailabilitySettings)
        -> Result<(), BackendError>;
    /// Calls on `date` that still hold capacity, i.e. everything not cancelled.
    fn active_calls_on(&self, date: NaiveDate) -> Result<Vec<ScheduledCall>, BackendError>;
    /// Inserts the call only if fewer than `max_bookings` active calls share
    /// its date and slot. The check and the write happen atomically; a full
    /// slot yields `BackendError::SlotFull`.
    fn insert_call_within_capacity(
        &self,
        call: NewScheduledCall,
        max_bookings: u32,
    ) -> Result<ScheduledCall, BackendError>;
    fn scheduled_calls(&self) -> Result<Vec<ScheduledCall>, BackendError>;
    fn cancel_call(&self, id: Uuid) -> Result<ScheduledCall, BackendError>;
}

pub trait ReleaseBackend: Clone + Send + Sync + 'static {
    fn release_versions(&self) -> Result<HashSet<String>, BackendError>;
    /// Returns `false` without writing when the version is already stored.
    fn insert_release(&self, release: NewRelease) -> Result<bool, BackendError>;
    /// Newest first by release date.
    fn releases(&self, limit: usize) -> Result<Vec<Release>, BackendError>;
    fn release(&self, version: &str) -> Result<Option<Release>, BackendError>;
}

pub trait Backend: BookingBackend + ReleaseBackend {}

impl<T: BookingBackend + ReleaseBackend> Backend for T {}
