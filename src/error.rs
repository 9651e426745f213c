use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Stored settings are malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored record is malformed: {0}")]
    Corrupt(String),

    #[error("Time slot is fully booked")]
    SlotFull,

    #[error("Scheduled call {0} does not exist")]
    CallNotFound(Uuid),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Weekly schedule must contain each weekday exactly once")]
    IncompleteWeek,

    #[error("Invalid start time '{0}', expected HH:MM")]
    InvalidStartTime(String),

    #[error("Time slot {0} must allow at least one booking")]
    ZeroCapacity(String),

    #[error("Time slot {0} is listed twice")]
    DuplicateSlot(String),

    #[error("Special date {0} is listed twice")]
    DuplicateSpecialDate(NaiveDate),

    #[error("{field} must be at most {max}")]
    WindowOutOfRange { field: &'static str, max: u32 },
}

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("Availability settings are not configured")]
    SettingsMissing,

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Bookings can only be made up to {0} days in advance")]
    TooFarInAdvance(u32),

    #[error("Bookings require at least {0} hours notice")]
    InsufficientNotice(u32),

    #[error("Booking window of {advance_booking_days} days and {minimum_notice_hours} hours notice is out of range")]
    WindowOutOfRange {
        advance_booking_days: u32,
        minimum_notice_hours: u32,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AvailabilityError {
    /// Booking-window violations are reported to the caller verbatim,
    /// everything else is an unexpected failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AvailabilityError::TooFarInAdvance(_) | AvailabilityError::InsufficientNotice(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("This time slot is already fully booked. Please choose another time.")]
    SlotFullyBooked,

    #[error("The time slot {0} is not offered on the selected date")]
    UnknownSlot(String),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for ScheduleError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::SlotFull => ScheduleError::SlotFullyBooked,
            other => ScheduleError::Backend(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub responded with status {0}")]
    Status(u16),

    #[error("GitHub token contains characters not allowed in a header")]
    InvalidToken,
}

#[derive(Debug, Error)]
pub enum ReleaseProcessingError {
    #[error("Release {0} has no recognisable version")]
    MissingVersion(u64),

    #[error("Release {0} has no date in its title and no publish date")]
    MissingDate(String),

    #[error("Release id {0} does not fit the release table")]
    IdOutOfRange(u64),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch releases: {0}")]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read availability file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Availability file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Availability file is invalid: {0}")]
    Invalid(#[from] SettingsError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
