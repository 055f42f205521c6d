pub mod events;
pub mod favorites;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_true() -> bool {
        true
    }

    fn default_server_url() -> String {
        "http://localhost:8509".into()
    }

    fn default_timeout_secs() -> u64 {
        300
    }

    /// Where favorite commands run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum ExecutionBackend {
        /// Child process on this machine
        #[default]
        Local,
        /// The command server over HTTP
        Remote,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ExecutionSettings {
        #[serde(default)]
        pub backend: ExecutionBackend,
        #[serde(default = "default_server_url")]
        pub server_url: String,
        /// Streams running longer than this end with an error event
        #[serde(default = "default_timeout_secs")]
        pub timeout_secs: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub execution: ExecutionSettings,
        /// Directory commands run in; `None` means the process cwd
        #[serde(default)]
        pub working_dir: Option<String>,
        #[serde(default = "default_true")]
        pub dark_mode: bool,
        #[serde(default = "default_true")]
        pub show_favorites: bool,
    }

    impl Default for ExecutionSettings {
        fn default() -> Self {
            Self {
                backend: ExecutionBackend::Local,
                server_url: default_server_url(),
                timeout_secs: default_timeout_secs(),
            }
        }
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                execution: ExecutionSettings::default(),
                working_dir: None,
                dark_mode: true,
                show_favorites: true,
            }
        }
    }

    impl AppSettings {
        /// Apply `TECHSUPPORT_SERVER_URL` / `TECHSUPPORT_WORKDIR` style overrides.
        ///
        /// Takes a lookup so tests don't have to touch the process environment.
        pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
            if let Some(url) = lookup("TECHSUPPORT_SERVER_URL").filter(|v| !v.trim().is_empty()) {
                self.execution.backend = ExecutionBackend::Remote;
                self.execution.server_url = url.trim().trim_end_matches('/').to_string();
            }
            if let Some(dir) = lookup("TECHSUPPORT_WORKDIR").filter(|v| !v.trim().is_empty()) {
                self.working_dir = Some(dir.trim().to_string());
            }
        }
    }

}
