use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::auth::{DEFAULT_INVESTIGATOR_PASSWORD, DEFAULT_INVESTIGATOR_USER};

/// Application-level constants
pub const APP_NAME: &str = "DR Assess";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port for the assessment service.
pub const DEFAULT_PORT: u16 = 8501;

/// Data directory name under the user's home.
const DATA_DIR_NAME: &str = "DRAssess";

/// Get the application data directory
/// ~/DRAssess/ on all platforms; falls back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Get the model directory under a data directory
pub fn model_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("model")
}

/// Default classifier artifact
pub fn default_model_path(data_dir: &std::path::Path) -> PathBuf {
    model_dir(data_dir).join("catboost_model.json")
}

/// Default attribution artifact
pub fn default_explainer_path(data_dir: &std::path::Path) -> PathBuf {
    model_dir(data_dir).join("explainer.json")
}

/// Default prediction history file
pub fn default_history_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("history").join("prediction_history.csv")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "dr_assess_lib=info,dr_assess=info,tower_http=info,warn"
}

/// Command-line options. Every flag can also come from a `DR_ASSESS_*`
/// environment variable.
#[derive(Debug, Parser)]
#[command(name = "dr-assess", version, about = "Diabetic retinopathy risk assessment service")]
pub struct Cli {
    /// Root for model artifacts and history
    #[arg(long, env = "DR_ASSESS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// CatBoost JSON classifier [default: <data-dir>/model/catboost_model.json]
    #[arg(long, env = "DR_ASSESS_MODEL")]
    pub model: Option<PathBuf>,

    /// CatBoost JSON used for attribution [default: <data-dir>/model/explainer.json]
    #[arg(long, env = "DR_ASSESS_EXPLAINER")]
    pub explainer: Option<PathBuf>,

    /// History CSV [default: <data-dir>/history/prediction_history.csv]
    #[arg(long, env = "DR_ASSESS_HISTORY")]
    pub history: Option<PathBuf>,

    #[arg(long, env = "DR_ASSESS_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, env = "DR_ASSESS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "DR_ASSESS_INVESTIGATOR_USER", default_value = DEFAULT_INVESTIGATOR_USER)]
    pub investigator_user: String,

    #[arg(
        long,
        env = "DR_ASSESS_INVESTIGATOR_PASSWORD",
        default_value = DEFAULT_INVESTIGATOR_PASSWORD,
        hide_env_values = true
    )]
    pub investigator_password: String,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub explainer_path: PathBuf,
    pub history_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub investigator_user: String,
    pub investigator_password: String,
}

impl AppConfig {
    /// Defaults rooted at `data_dir`, listening on localhost.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            model_path: default_model_path(&data_dir),
            explainer_path: default_explainer_path(&data_dir),
            history_path: default_history_path(&data_dir),
            data_dir,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            investigator_user: DEFAULT_INVESTIGATOR_USER.to_string(),
            investigator_password: DEFAULT_INVESTIGATOR_PASSWORD.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_data_dir(app_data_dir())
    }
}

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        let data_dir = cli.data_dir.unwrap_or_else(app_data_dir);
        Self {
            model_path: cli.model.unwrap_or_else(|| default_model_path(&data_dir)),
            explainer_path: cli
                .explainer
                .unwrap_or_else(|| default_explainer_path(&data_dir)),
            history_path: cli.history.unwrap_or_else(|| default_history_path(&data_dir)),
            data_dir,
            listen_addr: SocketAddr::new(cli.host, cli.port),
            investigator_user: cli.investigator_user,
            investigator_password: cli.investigator_password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        if let Some(home) = dirs::home_dir() {
            assert!(dir.starts_with(home));
        }
        assert!(dir.ends_with("DRAssess"));
    }

    #[test]
    fn default_paths_under_data_dir() {
        let config = AppConfig::with_data_dir("/srv/dr");
        assert_eq!(config.model_path, PathBuf::from("/srv/dr/model/catboost_model.json"));
        assert_eq!(config.explainer_path, PathBuf::from("/srv/dr/model/explainer.json"));
        assert_eq!(
            config.history_path,
            PathBuf::from("/srv/dr/history/prediction_history.csv")
        );
        assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn cli_overrides_individual_paths() {
        let cli = Cli::try_parse_from([
            "dr-assess",
            "--data-dir",
            "/srv/dr",
            "--model",
            "/opt/m.json",
            "--port",
            "9000",
            "--investigator-user",
            "alice",
        ])
        .unwrap();
        let config = AppConfig::from(cli);
        assert_eq!(config.model_path, PathBuf::from("/opt/m.json"));
        assert_eq!(config.explainer_path, PathBuf::from("/srv/dr/model/explainer.json"));
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.investigator_user, "alice");
    }

    #[test]
    fn cli_rejects_bad_port() {
        assert!(Cli::try_parse_from(["dr-assess", "--port", "http"]).is_err());
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
