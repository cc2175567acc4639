use serde::{Deserialize, Serialize};

use crate::{model::RecordId, task::Outcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub contact_id: RecordId,
    #[serde(flatten)]
    pub outcome: Outcome<()>,
}

/// Aggregate of one batch operation. Succeeded items stay committed even when siblings fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ItemResult>,
}

impl BatchReport {
    /// Pair outcomes with the contact ids they were produced for; both are in task order.
    pub fn from_outcomes(contact_ids: Vec<RecordId>, outcomes: Vec<Outcome<()>>) -> Self {
        debug_assert_eq!(contact_ids.len(), outcomes.len());

        let results: Vec<ItemResult> = contact_ids
            .into_iter()
            .zip(outcomes)
            .map(|(contact_id, outcome)| ItemResult {
                contact_id,
                outcome,
            })
            .collect();
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();

        Self {
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| Some((r.contact_id.as_str(), r.outcome.error()?)))
    }
}
