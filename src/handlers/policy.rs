//! Per-endpoint failure policy.
//!
//! Each endpoint runs a few storage steps. Whether a failed step fails the
//! request or is logged and replaced by a default is decided here, in one
//! table, rather than inside each handler.

use std::fmt::Display;

use tracing::error;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ListAll,
    Search,
    Create,
    Update,
    GetById,
    DeleteById,
    AppendCsv,
    ImportCsv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Read, including the read-after-write of create/update
    Fetch,
    /// Save, update or delete of a record
    Write,
    /// Recording field names in the column set
    RegisterColumns,
    /// Wiping rows and columns before a full import
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Fail the request
    Propagate,
    /// Log the error and carry on with a default value
    Recover,
}

#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy {
    pub endpoint: Endpoint,
    pub step: Step,
    pub on_failure: OnFailure,
}

const fn rule(endpoint: Endpoint, step: Step, on_failure: OnFailure) -> FailurePolicy {
    FailurePolicy { endpoint, step, on_failure }
}

pub const FAILURE_POLICIES: &[FailurePolicy] = &[
    rule(Endpoint::ListAll, Step::Fetch, OnFailure::Propagate),
    rule(Endpoint::Search, Step::Fetch, OnFailure::Propagate),
    rule(Endpoint::Create, Step::RegisterColumns, OnFailure::Recover),
    rule(Endpoint::Create, Step::Write, OnFailure::Propagate),
    rule(Endpoint::Create, Step::Fetch, OnFailure::Recover),
    rule(Endpoint::Update, Step::RegisterColumns, OnFailure::Recover),
    rule(Endpoint::Update, Step::Write, OnFailure::Recover),
    rule(Endpoint::Update, Step::Fetch, OnFailure::Recover),
    rule(Endpoint::GetById, Step::Fetch, OnFailure::Recover),
    rule(Endpoint::DeleteById, Step::Write, OnFailure::Recover),
    rule(Endpoint::AppendCsv, Step::RegisterColumns, OnFailure::Recover),
    rule(Endpoint::AppendCsv, Step::Write, OnFailure::Propagate),
    rule(Endpoint::ImportCsv, Step::Clear, OnFailure::Propagate),
    rule(Endpoint::ImportCsv, Step::RegisterColumns, OnFailure::Recover),
    rule(Endpoint::ImportCsv, Step::Write, OnFailure::Propagate),
];

/// Policy for a step; steps missing from the table propagate
pub fn policy(endpoint: Endpoint, step: Step) -> OnFailure {
    FAILURE_POLICIES
        .iter()
        .find(|p| p.endpoint == endpoint && p.step == step)
        .map(|p| p.on_failure)
        .unwrap_or(OnFailure::Propagate)
}

/// Apply the policy to a step's result.
///
/// `Ok(Some(value))` on success, `Ok(None)` when the failure was logged and
/// recovered, `Err` when it must fail the request.
pub fn settle<T>(
    endpoint: Endpoint,
    step: Step,
    result: Result<T, DatabaseError>,
    context: impl Display,
) -> Result<Option<T>, DatabaseError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => match policy(endpoint, step) {
            OnFailure::Recover => {
                error!(?endpoint, ?step, "{}: {}", context, err);
                Ok(None)
            }
            OnFailure::Propagate => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_endpoint_step_pair_appears_once() {
        for (i, a) in FAILURE_POLICIES.iter().enumerate() {
            for b in &FAILURE_POLICIES[i + 1..] {
                assert!(
                    !(a.endpoint == b.endpoint && a.step == b.step),
                    "duplicate rule for {:?}/{:?}",
                    a.endpoint,
                    a.step
                );
            }
        }
    }

    #[test]
    fn reads_after_writes_and_lookups_recover() {
        assert_eq!(policy(Endpoint::Create, Step::Fetch), OnFailure::Recover);
        assert_eq!(policy(Endpoint::Update, Step::Fetch), OnFailure::Recover);
        assert_eq!(policy(Endpoint::GetById, Step::Fetch), OnFailure::Recover);
    }

    #[test]
    fn update_and_delete_writes_are_swallowed_but_create_and_csv_writes_propagate() {
        assert_eq!(policy(Endpoint::Update, Step::Write), OnFailure::Recover);
        assert_eq!(policy(Endpoint::DeleteById, Step::Write), OnFailure::Recover);
        assert_eq!(policy(Endpoint::Create, Step::Write), OnFailure::Propagate);
        assert_eq!(policy(Endpoint::AppendCsv, Step::Write), OnFailure::Propagate);
        assert_eq!(policy(Endpoint::ImportCsv, Step::Write), OnFailure::Propagate);
    }

    #[test]
    fn column_registration_never_fails_a_request() {
        for endpoint in [Endpoint::Create, Endpoint::Update, Endpoint::AppendCsv, Endpoint::ImportCsv] {
            assert_eq!(policy(endpoint, Step::RegisterColumns), OnFailure::Recover);
        }
    }

    #[test]
    fn unlisted_steps_propagate() {
        assert_eq!(policy(Endpoint::GetById, Step::Write), OnFailure::Propagate);
        assert_eq!(policy(Endpoint::ImportCsv, Step::Fetch), OnFailure::Propagate);
    }

    #[test]
    fn settle_recovers_or_propagates() {
        let recovered = settle::<()>(
            Endpoint::DeleteById,
            Step::Write,
            Err(DatabaseError::not_found("gone")),
            "Deleting 1",
        );
        assert!(matches!(recovered, Ok(None)));

        let propagated = settle::<()>(
            Endpoint::Create,
            Step::Write,
            Err(DatabaseError::write("disk full")),
            "Adding 1",
        );
        assert!(matches!(propagated, Err(DatabaseError::Write(_))));

        assert!(matches!(settle(Endpoint::ListAll, Step::Fetch, Ok(3), "listing"), Ok(Some(3))));
    }
}
