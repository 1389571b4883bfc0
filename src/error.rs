// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

pub type LoadResult<T> = Result<T, AssetLoadError>;

/// Errors that make a loaded asset unusable.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("primitive uses {extension} but no codec is registered")]
    MissingCodec {
        extension: String,
    },

    #[error("codec failed to decode mesh '{mesh}': {message}")]
    Codec {
        mesh: String,
        message: String,
    },

    #[error("malformed asset: {0}")]
    Malformed(String),

    #[error("asset contains no renderable geometry")]
    Empty,
}

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid viewer config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Errors raised while reading the region metadata feed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid region feed: {0}")]
    Json(#[from] serde_json::Error),
}
