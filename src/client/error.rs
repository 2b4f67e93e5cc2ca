use super::ItemId;

/// Errors produced by reporting service calls.
///
/// Every variant is cheap to clone so one failure can be observed by all the
/// calls queued behind it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{method} {url} returned HTTP {status}: {body}")]
    Http {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to encode request for {url}: {message}")]
    Encode { url: String, message: String },

    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("item {0} is not known to the reporting client")]
    UnknownItem(ItemId),

    #[error("request for item {0} was not sent because an earlier request failed")]
    Dependency(ItemId),

    #[error("request task aborted: {0}")]
    Aborted(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub(crate) fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = ClientError::Http {
            method: "PUT".to_string(),
            url: "http://rp/api/v1/demo/item/abc".to_string(),
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "PUT http://rp/api/v1/demo/item/abc returned HTTP 404: not found"
        );
    }

    #[test]
    fn test_dependency_error_names_item() {
        let err = ClientError::Dependency(ItemId::new("suite-1"));
        assert!(err.to_string().contains("suite-1"));
    }
}
