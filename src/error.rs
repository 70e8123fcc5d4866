use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("browser init error: {0}")]
    BrowserInit(String),

    #[error("navigation error: {0}")]
    Navigation(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("notification rejected: {0}")]
    Notify(String),

    #[error("notification transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
