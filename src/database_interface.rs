use crate::{
    backend::{BookingBackend, ReleaseBackend},
    error::BackendError,
    schema::{availability_settings, releases, scheduled_calls},
    types::{AvailabilitySettings, CallStatus, NewRelease, NewScheduledCall, Release, ScheduledCall},
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::{ConnectionError, PgConnection};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};
use uuid::Uuid;

/// The settings table holds exactly one row.
const SETTINGS_ROW: i32 = 1;
const CANCELLED: &str = "cancelled";

#[derive(Queryable, Selectable)]
#[diesel(table_name = scheduled_calls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct CallRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: Option<String>,
    call_date: NaiveDate,
    time_slot: String,
    call_type: String,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CallRow> for ScheduledCall {
    type Error = BackendError;

    fn try_from(row: CallRow) -> Result<Self, Self::Error> {
        Ok(ScheduledCall {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            call_date: row.call_date,
            time_slot: row.time_slot,
            call_type: row.call_type.parse().map_err(BackendError::Corrupt)?,
            status: row.status.parse().map_err(BackendError::Corrupt)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = scheduled_calls)]
struct NewCallRow<'a> {
    id: Uuid,
    full_name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    call_date: NaiveDate,
    time_slot: &'a str,
    call_type: &'a str,
    status: &'a str,
    notes: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = releases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ReleaseRow {
    id: Uuid,
    version: String,
    release_date: NaiveDate,
    breaking_changes: bool,
    content: String,
    contributors: Option<String>,
    github_id: i64,
    last_synced_at: DateTime<Utc>,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Release {
            id: row.id,
            version: row.version,
            release_date: row.release_date,
            breaking_changes: row.breaking_changes,
            content: row.content,
            contributors: row.contributors,
            github_id: row.github_id,
            last_synced_at: row.last_synced_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = releases)]
struct NewReleaseRow<'a> {
    id: Uuid,
    version: &'a str,
    release_date: NaiveDate,
    breaking_changes: bool,
    content: &'a str,
    contributors: Option<&'a str>,
    github_id: i64,
    last_synced_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<PgConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> Result<Self, ConnectionError> {
        let connection = Self::establish_connection(database_url)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn establish_connection(database_url: &str) -> Result<PgConnection, ConnectionError> {
        PgConnection::establish(database_url)
    }

    fn lock(&self) -> Result<MutexGuard<'_, PgConnection>, BackendError> {
        self.connection
            .lock()
            .map_err(|_| BackendError::Unavailable("database connection lock poisoned".into()))
    }

    #[cfg(test)]
    fn clear(&self) -> Result<(), BackendError> {
        let mut connection = self.lock()?;
        diesel::delete(scheduled_calls::table).execute(&mut *connection)?;
        diesel::delete(releases::table).execute(&mut *connection)?;
        diesel::delete(availability_settings::table).execute(&mut *connection)?;
        Ok(())
    }
}

impl BookingBackend for DatabaseInterface {
    fn availability_settings(&self) -> Result<Option<AvailabilitySettings>, BackendError> {
        let mut connection = self.lock()?;
        let stored = availability_settings::table
            .filter(availability_settings::id.eq(SETTINGS_ROW))
            .select(availability_settings::settings)
            .first::<serde_json::Value>(&mut *connection)
            .optional()?;

        Ok(stored.map(serde_json::from_value).transpose()?)
    }

    fn save_availability_settings(
        &self,
        settings: AvailabilitySettings,
    ) -> Result<(), BackendError> {
        let value = serde_json::to_value(&settings)?;
        let now = Utc::now();
        let mut connection = self.lock()?;

        diesel::insert_into(availability_settings::table)
            .values((
                availability_settings::id.eq(SETTINGS_ROW),
                availability_settings::settings.eq(value.clone()),
                availability_settings::updated_at.eq(now),
            ))
            .on_conflict(availability_settings::id)
            .do_update()
            .set((
                availability_settings::settings.eq(value),
                availability_settings::updated_at.eq(now),
            ))
            .execute(&mut *connection)?;
        Ok(())
    }

    fn active_calls_on(&self, date: NaiveDate) -> Result<Vec<ScheduledCall>, BackendError> {
        let mut connection = self.lock()?;
        scheduled_calls::table
            .filter(scheduled_calls::call_date.eq(date))
            .filter(scheduled_calls::status.ne(CANCELLED))
            .select(CallRow::as_select())
            .load::<CallRow>(&mut *connection)?
            .into_iter()
            .map(ScheduledCall::try_from)
            .collect()
    }

    fn insert_call_within_capacity(
        &self,
        call: NewScheduledCall,
        max_bookings: u32,
    ) -> Result<ScheduledCall, BackendError> {
        let mut connection = self.lock()?;

        // The table lock serialises concurrent bookings across server
        // instances; it is released when the transaction ends.
        connection.transaction::<_, BackendError, _>(|conn| {
            diesel::sql_query("LOCK TABLE scheduled_calls IN SHARE ROW EXCLUSIVE MODE")
                .execute(conn)?;

            let booked: i64 = scheduled_calls::table
                .filter(scheduled_calls::call_date.eq(call.call_date))
                .filter(scheduled_calls::time_slot.eq(&call.time_slot))
                .filter(scheduled_calls::status.ne(CANCELLED))
                .count()
                .get_result(conn)?;
            if booked >= i64::from(max_bookings) {
                return Err(BackendError::SlotFull);
            }

            let now = Utc::now();
            let row = diesel::insert_into(scheduled_calls::table)
                .values(&NewCallRow {
                    id: Uuid::new_v4(),
                    full_name: &call.full_name,
                    email: &call.email,
                    phone: call.phone.as_deref(),
                    call_date: call.call_date,
                    time_slot: &call.time_slot,
                    call_type: call.call_type.as_str(),
                    status: CallStatus::New.as_str(),
                    notes: call.notes.as_deref(),
                    created_at: now,
                    updated_at: now,
                })
                .returning(CallRow::as_returning())
                .get_result::<CallRow>(conn)?;
            ScheduledCall::try_from(row)
        })
    }

    fn scheduled_calls(&self) -> Result<Vec<ScheduledCall>, BackendError> {
        let mut connection = self.lock()?;
        scheduled_calls::table
            .order((
                scheduled_calls::call_date.desc(),
                scheduled_calls::time_slot.asc(),
            ))
            .select(CallRow::as_select())
            .load::<CallRow>(&mut *connection)?
            .into_iter()
            .map(ScheduledCall::try_from)
            .collect()
    }

    fn cancel_call(&self, call_id: Uuid) -> Result<ScheduledCall, BackendError> {
        let mut connection = self.lock()?;

        let updated = diesel::update(
            scheduled_calls::table
                .filter(scheduled_calls::id.eq(call_id))
                .filter(scheduled_calls::status.ne(CANCELLED)),
        )
        .set((
            scheduled_calls::status.eq(CANCELLED),
            scheduled_calls::updated_at.eq(Utc::now()),
        ))
        .returning(CallRow::as_returning())
        .get_result::<CallRow>(&mut *connection)
        .optional()?;

        let row = match updated {
            Some(row) => row,
            None => scheduled_calls::table
                .filter(scheduled_calls::id.eq(call_id))
                .select(CallRow::as_select())
                .first::<CallRow>(&mut *connection)
                .optional()?
                .ok_or(BackendError::CallNotFound(call_id))?,
        };
        ScheduledCall::try_from(row)
    }
}

impl ReleaseBackend for DatabaseInterface {
    fn release_versions(&self) -> Result<HashSet<String>, BackendError> {
        let mut connection = self.lock()?;
        let versions = releases::table
            .select(releases::version)
            .load::<String>(&mut *connection)?;
        Ok(versions.into_iter().collect())
    }

    fn insert_release(&self, release: NewRelease) -> Result<bool, BackendError> {
        let mut connection = self.lock()?;
        let inserted = diesel::insert_into(releases::table)
            .values(&NewReleaseRow {
                id: Uuid::new_v4(),
                version: &release.version,
                release_date: release.release_date,
                breaking_changes: release.breaking_changes,
                content: &release.content,
                contributors: release.contributors.as_deref(),
                github_id: release.github_id,
                last_synced_at: release.last_synced_at,
            })
            .on_conflict(releases::version)
            .do_nothing()
            .execute(&mut *connection)?;
        Ok(inserted == 1)
    }

    fn releases(&self, limit: usize) -> Result<Vec<Release>, BackendError> {
        let mut connection = self.lock()?;
        let rows = releases::table
            .order((releases::release_date.desc(), releases::version.desc()))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(ReleaseRow::as_select())
            .load::<ReleaseRow>(&mut *connection)?;
        Ok(rows.into_iter().map(Release::from).collect())
    }

    fn release(&self, version: &str) -> Result<Option<Release>, BackendError> {
        let mut connection = self.lock()?;
        let row = releases::table
            .filter(releases::version.eq(version))
            .select(ReleaseRow::as_select())
            .first::<ReleaseRow>(&mut *connection)
            .optional()?;
        Ok(row.map(Release::from))
    }
}
