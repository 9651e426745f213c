use crate::{
    availability::validate_settings, backend::BookingBackend, error::SeedError,
    types::AvailabilitySettings,
};
use std::{fs, path::Path};
use tracing::info;

/// Stores the settings found in `path` unless the backend already has some.
/// Returns whether anything was written.
pub fn seed_availability<B: BookingBackend>(backend: &B, path: &Path) -> Result<bool, SeedError> {
    if backend.availability_settings()?.is_some() {
        info!(path = %path.display(), "Availability settings already stored, ignoring file");
        return Ok(false);
    }

    let settings: AvailabilitySettings = serde_json::from_str(&fs::read_to_string(path)?)?;
    validate_settings(&settings)?;
    backend.save_availability_settings(settings)?;
    info!(path = %path.display(), "Seeded availability settings");
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{error::SettingsError, local_store::LocalStore, testutils::sample_settings};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_seeds_empty_backend() {
        let file = settings_file(&serde_json::to_string(&sample_settings()).unwrap());
        let local_store = LocalStore::default();

        assert!(seed_availability(&local_store, file.path()).unwrap());
        assert_eq!(
            local_store.availability_settings().unwrap(),
            Some(sample_settings())
        );
    }

    #[test]
    fn test_keeps_stored_settings() {
        let mut stored = sample_settings();
        stored.advance_booking_days = 7;
        let local_store = LocalStore::default();
        local_store.save_availability_settings(stored.clone()).unwrap();

        let file = settings_file(&serde_json::to_string(&sample_settings()).unwrap());
        assert!(!seed_availability(&local_store, file.path()).unwrap());
        assert_eq!(local_store.availability_settings().unwrap(), Some(stored));
    }

    #[test]
    fn test_rejects_invalid_file() {
        let local_store = LocalStore::default();

        let file = settings_file("{ not json");
        assert!(matches!(
            seed_availability(&local_store, file.path()),
            Err(SeedError::Json(_))
        ));

        let mut settings = sample_settings();
        settings.weekly_schedule.pop();
        let file = settings_file(&serde_json::to_string(&settings).unwrap());
        assert!(matches!(
            seed_availability(&local_store, file.path()),
            Err(SeedError::Invalid(SettingsError::IncompleteWeek))
        ));
        assert_eq!(local_store.availability_settings().unwrap(), None);
    }

    #[test]
    fn test_missing_file() {
        let local_store = LocalStore::default();
        assert!(matches!(
            seed_availability(&local_store, Path::new("/nonexistent/availability.json")),
            Err(SeedError::Io(_))
        ));
    }
}
