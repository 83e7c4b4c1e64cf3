use serde::Serialize;
use thiserror::Error;

/// Per-player failure taxonomy. Every variant is non-fatal to a slate batch:
/// it populates the `error` field of that player's row and processing moves
/// on to the next player. Display strings are deliberately coarse; nothing
/// from upstream responses is echoed back over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("Player not found")]
    NotFound,
    #[error("Failed to fetch page from stats site")]
    FetchFailed,
    #[error("No match history found")]
    NoHistory,
    #[error("No valid matches found (need matches with exactly 2 maps)")]
    InsufficientEligibleMatches,
}

impl Serialize for PlayerError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::PlayerError;

    #[test]
    fn messages_are_coarse() {
        assert_eq!(PlayerError::NotFound.to_string(), "Player not found");
        assert_eq!(
            PlayerError::NoHistory.to_string(),
            "No match history found"
        );
    }

    #[test]
    fn serializes_as_message_string() {
        let json = serde_json::to_string(&PlayerError::NotFound).expect("serialize");
        assert_eq!(json, "\"Player not found\"");
    }
}
