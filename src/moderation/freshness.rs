/// Account-age heuristic. Telegram hands out user ids sequentially, so a
/// large id correlates with a recently created account. Best effort only;
/// the threshold lives in configuration because the id-assignment scheme can
/// drift over time.
pub fn is_fresh_account_id(user_id: i64, threshold: i64) -> bool {
    user_id >= threshold
}

/// Error texts that mean a join request no longer exists upstream: the user
/// withdrew it, an admin already handled it, or the user got in some other
/// way. Matched case-insensitively as substrings.
const RESOLVED_REQUEST_PHRASES: &[&str] = &[
    "chat_join_request_not_found",
    "join request not found",
    "user_already_participant",
    "user already participant",
    "user is already a participant",
    "user_not_found",
];

/// True when a decline failure should settle the request as expired instead
/// of leaving it pending for a retry.
pub fn is_resolved_join_request_error(text: &str) -> bool {
    let text = text.to_lowercase();
    RESOLVED_REQUEST_PHRASES
        .iter()
        .any(|phrase| text.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_is_threshold_comparison() {
        let threshold = 7_000_000_000;
        assert!(is_fresh_account_id(7_000_000_000, threshold));
        assert!(is_fresh_account_id(7_100_000_000, threshold));
        assert!(!is_fresh_account_id(6_999_999_999, threshold));
        assert!(!is_fresh_account_id(42, threshold));
        assert!(is_fresh_account_id(42, 0));
    }

    #[test]
    fn known_phrases_are_recognized() {
        for phrase in RESOLVED_REQUEST_PHRASES {
            assert!(is_resolved_join_request_error(phrase), "missed: {phrase}");
        }
    }

    #[test]
    fn matching_ignores_case_and_surrounding_text() {
        assert!(is_resolved_join_request_error(
            "Bad Request: USER_ALREADY_PARTICIPANT"
        ));
        assert!(is_resolved_join_request_error(
            "ApiError: the user is already a participant of the chat"
        ));
        assert!(is_resolved_join_request_error(
            "Bad Request: Chat_Join_Request_Not_Found"
        ));
    }

    #[test]
    fn transient_errors_are_not_resolved() {
        assert!(!is_resolved_join_request_error("Too Many Requests: retry after 5"));
        assert!(!is_resolved_join_request_error("network timeout"));
        assert!(!is_resolved_join_request_error(""));
    }
}
