use std::time::Duration;

use thiserror::Error;

use crate::models::Category;

/// Provider response did not have the shape the adapter expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Everything that can go wrong while producing a live snapshot.
///
/// None of these reach the page: the aggregator recovers from all of them by
/// serving cached or mock data.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned HTTP {status}")]
    Http { status: u16 },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{provider} has no {category} feed")]
    Unsupported {
        provider: &'static str,
        category: Category,
    },
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Adapter(AdapterError::MalformedPayload(err.to_string()))
        } else if let Some(status) = err.status() {
            FeedError::Http {
                status: status.as_u16(),
            }
        } else {
            FeedError::Network(err.to_string())
        }
    }
}
