use fleet_analytics_config::Environment;
use serde::{
    Serialize,
    Serializer,
};
use std::time::Duration;

/// Failure of a single data-access query.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query timed out after {}", humanize(.0))]
    Timeout(Duration),
    #[error("connection pool is closed")]
    PoolClosed,
}

/// Failure of a whole view request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("the {store} store failed while running `{query}`: {error}")]
    PrimaryUnavailable {
        store: String,
        query: &'static str,
        error: SourceError,
    },
    #[error("{0}")]
    InvalidGrouping(#[from] InvalidGrouping),
}

const GENERIC_CONNECTION_MESSAGE: &str = "Could not connect to the fleet database";

impl ViewError {
    /// The message shown to end users. Production never exposes store details.
    pub fn user_message(&self, environment: Environment) -> String {
        match self {
            ViewError::PrimaryUnavailable { .. } if environment.is_production() => {
                GENERIC_CONNECTION_MESSAGE.to_string()
            }
            ViewError::PrimaryUnavailable { .. } => format!("{GENERIC_CONNECTION_MESSAGE}: {self}"),
            ViewError::InvalidGrouping(err) => err.to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a breakdown groups by one or two dimensions, got {0}")]
pub struct InvalidGrouping(pub usize);

/// Marker for secondary data that could not be fetched. Views carry it in
/// place of the data so callers can render a pending state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{store} data unavailable for `{query}`: {reason}")]
pub struct Unavailable {
    pub store: String,
    pub query: &'static str,
    pub reason: SourceError,
}

/// Secondary data, or the reason it is missing.
pub type Secondary<T> = Result<T, Unavailable>;

/// Serializes secondary data as its value, or `null` when unavailable.
pub fn serialize_secondary<T, S>(value: &Secondary<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Ok(value) => value.serialize(serializer),
        Err(_) => serializer.serialize_none(),
    }
}

fn humanize(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn primary_failure() -> ViewError {
        ViewError::PrimaryUnavailable {
            store: "inventory".to_string(),
            query: "fetch_active_fleet",
            error: SourceError::Connection("connection refused".to_string()),
        }
    }

    #[test]
    fn production_hides_details() {
        assert_eq!(
            primary_failure().user_message(Environment::Production),
            "Could not connect to the fleet database"
        );
    }

    #[test]
    fn development_shows_the_chain() {
        assert_eq!(
            primary_failure().user_message(Environment::Development),
            "Could not connect to the fleet database: the inventory store failed while running \
             `fetch_active_fleet`: connection failed: connection refused"
        );
    }

    #[test]
    fn timeout_message_is_human_readable() {
        assert_eq!(
            SourceError::Timeout(Duration::from_secs(90)).to_string(),
            "query timed out after 1m 30s"
        );
    }

    #[test]
    fn unavailable_serializes_as_null() {
        #[derive(Serialize)]
        struct View {
            #[serde(serialize_with = "serialize_secondary")]
            idle: Secondary<u32>,
        }
        let degraded = View {
            idle: Err(Unavailable {
                store: "analytics".to_string(),
                query: "fetch_idle_snapshot",
                reason: SourceError::PoolClosed,
            }),
        };
        assert_eq!(serde_json::to_string(&degraded).unwrap(), r#"{"idle":null}"#);
        assert_eq!(serde_json::to_string(&View { idle: Ok(3) }).unwrap(), r#"{"idle":3}"#);
    }
}
