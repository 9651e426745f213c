use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> u16;
    fn database_url(&self) -> Option<String>;
    fn admin_password(&self) -> String;
    /// `None` disables the release sync endpoint.
    fn sync_token(&self) -> Option<String>;
    fn github_api_url(&self) -> String;
    fn github_repository(&self) -> String;
    fn github_token(&self) -> Option<String>;
    fn availability_file(&self) -> Option<PathBuf>;
}
