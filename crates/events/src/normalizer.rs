//! Webhook payload normalization.
//!
//! [`normalize`] maps an `X-GitHub-Event` value and its JSON body onto a
//! [`NormalizedEvent`]. It performs no I/O and never panics: malformed input is
//! reported as [`Normalization::Invalid`], well-formed but uninteresting input as
//! [`Normalization::Ignored`].
//!
//! ## Rules
//!
//! | Event type | Payload condition | Outcome |
//! |------------|-------------------|---------|
//! | `push` | `pusher.name` and `ref` present | `push` to the last segment of `ref` |
//! | `pull_request` | `action == "opened"` | `pull_request` from `head.ref` to `base.ref` |
//! | `pull_request` | `action == "closed"` and `merged == true` | `merge` from `head.ref` to `base.ref` |
//! | `pull_request` | any other action | Ignored |
//! | anything else | any | Ignored |
//!
//! For `pull_request` every required field is checked before the action is
//! looked at, so a `labeled` delivery with a broken body is Invalid, not Ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::{AuthorName, BranchName, EventAction, InvalidPayload, NormalizedEvent, Timestamp};

/// `X-GitHub-Event` value for branch pushes.
pub const PUSH_EVENT: &str = "push";

/// `X-GitHub-Event` value for pull request activity.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// The result of normalizing one webhook delivery.
#[derive(Debug)]
pub enum Normalization {
    /// The delivery maps onto a record that should be stored.
    Accepted(NormalizedEvent),
    /// The delivery is well-formed but not something we record.
    Ignored(IgnoreReason),
    /// The delivery's event type is recognised but its payload is broken.
    Invalid(InvalidPayload),
}

/// Why a delivery was [`Normalization::Ignored`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event type is not `push` or `pull_request`. `None` when the
    /// delivery carried no event type at all.
    UnhandledEventType { event_type: Option<String> },

    /// A pull request transition other than "opened" or "closed and merged".
    UnhandledPullRequestAction { action: String, merged: bool },
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::UnhandledEventType { event_type: Some(t) } => {
                write!(f, "unhandled event type '{t}'")
            }
            IgnoreReason::UnhandledEventType { event_type: None } => {
                f.write_str("delivery has no event type")
            }
            IgnoreReason::UnhandledPullRequestAction { action, merged } => {
                write!(f, "unhandled pull request action '{action}' (merged: {merged})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
//
// Only the fields we read are declared; everything else in the delivery is
// skipped by serde. Author and branch fields deserialize straight into the
// non-empty newtypes, so an empty login or ref is a malformed payload.
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PushPayload {
    pusher: Pusher,
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Deserialize)]
struct Pusher {
    name: AuthorName,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    action: String,
    pull_request: PullRequestBody,
}

#[derive(Deserialize)]
struct PullRequestBody {
    user: PullRequestUser,
    head: GitRef,
    base: GitRef,
    #[serde(default)]
    merged: Option<bool>,
}

#[derive(Deserialize)]
struct PullRequestUser {
    login: AuthorName,
}

#[derive(Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    name: BranchName,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Normalizes a delivery, stamping accepted records with the current time.
///
/// `event_type` is the `X-GitHub-Event` header value, `None` if it was absent.
pub fn normalize(event_type: Option<&str>, payload: &Value) -> Normalization {
    normalize_at(event_type, payload, Timestamp::now())
}

/// Normalizes a delivery, stamping accepted records with `now`.
///
/// Two calls with the same arguments produce identical results.
pub fn normalize_at(event_type: Option<&str>, payload: &Value, now: Timestamp) -> Normalization {
    match event_type {
        Some(PUSH_EVENT) => match normalize_push(payload, now) {
            Ok(event) => Normalization::Accepted(event),
            Err(invalid) => Normalization::Invalid(invalid),
        },
        Some(PULL_REQUEST_EVENT) => normalize_pull_request(payload, now),
        other => Normalization::Ignored(IgnoreReason::UnhandledEventType {
            event_type: other.map(str::to_owned),
        }),
    }
}

fn normalize_push(payload: &Value, now: Timestamp) -> Result<NormalizedEvent, InvalidPayload> {
    let push: PushPayload = parse(PUSH_EVENT, payload)?;

    let branch = push.git_ref.rsplit('/').next().and_then(BranchName::new);
    let Some(to_branch) = branch else {
        return Err(InvalidPayload::RefWithoutBranch {
            git_ref: push.git_ref,
        });
    };

    Ok(NormalizedEvent {
        action: EventAction::Push,
        author: push.pusher.name,
        from_branch: None,
        to_branch,
        timestamp: now,
    })
}

fn normalize_pull_request(payload: &Value, now: Timestamp) -> Normalization {
    let PullRequestPayload {
        action,
        pull_request: pr,
    } = match parse(PULL_REQUEST_EVENT, payload) {
        Ok(parsed) => parsed,
        Err(invalid) => return Normalization::Invalid(invalid),
    };
    let merged = pr.merged.unwrap_or(false);

    let kind = match action.as_str() {
        "opened" => EventAction::PullRequest,
        "closed" if merged => EventAction::Merge,
        _ => {
            return Normalization::Ignored(IgnoreReason::UnhandledPullRequestAction {
                action,
                merged,
            })
        }
    };

    Normalization::Accepted(NormalizedEvent {
        action: kind,
        author: pr.user.login,
        from_branch: Some(pr.head.name),
        to_branch: pr.base.name,
        timestamp: now,
    })
}

fn parse<'de, T: Deserialize<'de>>(
    event_type: &'static str,
    payload: &'de Value,
) -> Result<T, InvalidPayload> {
    if !payload.is_object() {
        return Err(InvalidPayload::NotAnObject { event_type });
    }
    T::deserialize(payload).map_err(|source| InvalidPayload::Malformed { event_type, source })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn fixed_now() -> Timestamp {
        Timestamp::from_utc(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn pr_payload(action: &str, merged: Option<bool>) -> Value {
        let mut body = json!({
            "action": action,
            "number": 7,
            "pull_request": {
                "user": { "login": "bob" },
                "head": { "ref": "feature-x" },
                "base": { "ref": "main" },
            },
        });
        if let Some(merged) = merged {
            body["pull_request"]["merged"] = json!(merged);
        }
        body
    }

    fn expect_accepted(result: Normalization) -> NormalizedEvent {
        match result {
            Normalization::Accepted(event) => event,
            other => panic!("expected an accepted event, got {other:?}"),
        }
    }

    // -- push ---------------------------------------------------------------

    #[test]
    fn test_push_uses_last_ref_segment_as_branch() {
        let payload = json!({ "pusher": { "name": "alice" }, "ref": "refs/heads/main" });

        let event = expect_accepted(normalize_at(Some("push"), &payload, fixed_now()));

        assert_eq!(event.action, EventAction::Push);
        assert_eq!(event.author.as_str(), "alice");
        assert_eq!(event.from_branch, None);
        assert_eq!(event.to_branch.as_str(), "main");
        assert_eq!(event.timestamp, fixed_now());
    }

    #[test]
    fn test_push_with_nested_branch_keeps_only_last_segment() {
        let payload = json!({ "pusher": { "name": "alice" }, "ref": "refs/heads/release/v2" });

        let event = expect_accepted(normalize_at(Some("push"), &payload, fixed_now()));

        assert_eq!(event.to_branch.as_str(), "v2");
    }

    #[test]
    fn test_push_for_many_branch_names() {
        for branch in ["main", "dev", "feature-x", "hotfix_1", "v1.2.3"] {
            let payload = json!({
                "pusher": { "name": "alice" },
                "ref": format!("refs/heads/{branch}"),
            });

            let event = expect_accepted(normalize(Some("push"), &payload));

            assert_eq!(event.action, EventAction::Push);
            assert_eq!(event.to_branch.as_str(), branch);
            assert!(event.from_branch.is_none());
        }
    }

    #[test]
    fn test_push_missing_pusher_is_invalid() {
        let payload = json!({ "ref": "refs/heads/main" });

        let result = normalize_at(Some("push"), &payload, fixed_now());

        assert!(matches!(
            result,
            Normalization::Invalid(InvalidPayload::Malformed { event_type: "push", .. })
        ));
    }

    #[test]
    fn test_push_missing_ref_is_invalid() {
        let payload = json!({ "pusher": { "name": "alice" } });

        let result = normalize_at(Some("push"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(InvalidPayload::Malformed { .. })));
    }

    #[test]
    fn test_push_with_non_string_ref_is_invalid() {
        let payload = json!({ "pusher": { "name": "alice" }, "ref": 42 });

        let result = normalize_at(Some("push"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(InvalidPayload::Malformed { .. })));
    }

    #[test]
    fn test_push_with_null_pusher_is_invalid() {
        let payload = json!({ "pusher": null, "ref": "refs/heads/main" });

        let result = normalize_at(Some("push"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(InvalidPayload::Malformed { .. })));
    }

    #[test]
    fn test_push_with_trailing_slash_ref_is_invalid() {
        let payload = json!({ "pusher": { "name": "alice" }, "ref": "refs/heads/" });

        let result = normalize_at(Some("push"), &payload, fixed_now());

        match result {
            Normalization::Invalid(InvalidPayload::RefWithoutBranch { git_ref }) => {
                assert_eq!(git_ref, "refs/heads/");
            }
            other => panic!("expected RefWithoutBranch, got {other:?}"),
        }
    }

    #[test]
    fn test_push_with_empty_author_is_invalid() {
        let payload = json!({ "pusher": { "name": "" }, "ref": "refs/heads/main" });

        let result = normalize_at(Some("push"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(_)));
    }

    #[test]
    fn test_push_payload_that_is_not_an_object_is_invalid() {
        for payload in [json!(null), json!([]), json!("push"), json!(3)] {
            let result = normalize_at(Some("push"), &payload, fixed_now());

            assert!(
                matches!(result, Normalization::Invalid(InvalidPayload::NotAnObject { .. })),
                "payload {payload} should be invalid"
            );
        }
    }

    // -- pull_request -------------------------------------------------------

    #[test]
    fn test_opened_pull_request_is_recorded() {
        let event = expect_accepted(normalize_at(
            Some("pull_request"),
            &pr_payload("opened", None),
            fixed_now(),
        ));

        assert_eq!(event.action, EventAction::PullRequest);
        assert_eq!(event.author.as_str(), "bob");
        assert_eq!(event.from_branch.as_ref().map(BranchName::as_str), Some("feature-x"));
        assert_eq!(event.to_branch.as_str(), "main");
    }

    #[test]
    fn test_closed_and_merged_pull_request_is_a_merge() {
        let event = expect_accepted(normalize_at(
            Some("pull_request"),
            &pr_payload("closed", Some(true)),
            fixed_now(),
        ));

        assert_eq!(event.action, EventAction::Merge);
        assert_eq!(event.from_branch.as_ref().map(BranchName::as_str), Some("feature-x"));
        assert_eq!(event.to_branch.as_str(), "main");
    }

    #[test]
    fn test_closed_without_merge_is_ignored() {
        for merged in [Some(false), None] {
            let result = normalize_at(Some("pull_request"), &pr_payload("closed", merged), fixed_now());

            match result {
                Normalization::Ignored(IgnoreReason::UnhandledPullRequestAction { action, merged }) => {
                    assert_eq!(action, "closed");
                    assert!(!merged);
                }
                other => panic!("expected Ignored, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_closed_with_null_merged_is_ignored() {
        let mut payload = pr_payload("closed", None);
        payload["pull_request"]["merged"] = Value::Null;

        let result = normalize_at(Some("pull_request"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Ignored(_)));
    }

    #[test]
    fn test_other_pull_request_actions_are_ignored() {
        for action in ["labeled", "synchronize", "reopened", "edited", "assigned"] {
            let result = normalize_at(Some("pull_request"), &pr_payload(action, Some(true)), fixed_now());

            assert!(
                matches!(result, Normalization::Ignored(IgnoreReason::UnhandledPullRequestAction { .. })),
                "action {action} should be ignored"
            );
        }
    }

    #[test]
    fn test_pull_request_missing_required_fields_is_invalid() {
        let removals = [
            ("", "action"),
            ("", "pull_request"),
            ("/pull_request", "user"),
            ("/pull_request", "head"),
            ("/pull_request", "base"),
        ];

        for (parent, field) in removals {
            let mut payload = pr_payload("opened", None);
            payload
                .pointer_mut(parent)
                .and_then(Value::as_object_mut)
                .unwrap()
                .remove(field);

            let result = normalize_at(Some("pull_request"), &payload, fixed_now());

            assert!(
                matches!(
                    result,
                    Normalization::Invalid(InvalidPayload::Malformed { event_type: "pull_request", .. })
                ),
                "removing {parent}/{field} should make the payload invalid"
            );
        }
    }

    #[test]
    fn test_pull_request_with_non_bool_merged_is_invalid() {
        let mut payload = pr_payload("closed", None);
        payload["pull_request"]["merged"] = json!("yes");

        let result = normalize_at(Some("pull_request"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(_)));
    }

    #[test]
    fn test_broken_payload_is_invalid_even_for_ignored_actions() {
        let payload = json!({ "action": "labeled", "pull_request": { "user": { "login": "bob" } } });

        let result = normalize_at(Some("pull_request"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(_)));
    }

    #[test]
    fn test_pull_request_with_empty_base_ref_is_invalid() {
        let mut payload = pr_payload("opened", None);
        payload["pull_request"]["base"]["ref"] = json!("");

        let result = normalize_at(Some("pull_request"), &payload, fixed_now());

        assert!(matches!(result, Normalization::Invalid(_)));
    }

    // -- other event types --------------------------------------------------

    #[test]
    fn test_unrecognised_event_types_are_ignored() {
        let payload = json!({ "pusher": { "name": "alice" }, "ref": "refs/heads/main" });

        for event_type in ["issues", "ping", "Push", "release", ""] {
            let result = normalize_at(Some(event_type), &payload, fixed_now());

            match result {
                Normalization::Ignored(IgnoreReason::UnhandledEventType { event_type: Some(t) }) => {
                    assert_eq!(t, event_type);
                }
                other => panic!("expected Ignored for {event_type:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_event_type_is_ignored() {
        let result = normalize_at(None, &json!({}), fixed_now());

        assert!(matches!(
            result,
            Normalization::Ignored(IgnoreReason::UnhandledEventType { event_type: None })
        ));
    }

    #[test]
    fn test_normalization_is_deterministic_for_a_fixed_clock() {
        let payload = pr_payload("closed", Some(true));

        let first = expect_accepted(normalize_at(Some("pull_request"), &payload, fixed_now()));
        let second = expect_accepted(normalize_at(Some("pull_request"), &payload, fixed_now()));

        assert_eq!(first, second);
    }

    #[test]
    fn test_normalization_differs_only_in_timestamp() {
        let payload = json!({ "pusher": { "name": "alice" }, "ref": "refs/heads/main" });

        let first = expect_accepted(normalize(Some("push"), &payload));
        let mut second = expect_accepted(normalize(Some("push"), &payload));

        assert!(second.timestamp >= first.timestamp);
        second.timestamp = first.timestamp;
        assert_eq!(first, second);
    }
}
