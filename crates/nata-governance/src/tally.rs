use serde::Serialize;

use nata_records::Vote;

/// Aggregate of the votes on one proposal.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub yes_votes: usize,
    pub no_votes: usize,
    pub yes_weight: f64,
    pub no_weight: f64,
}

impl Tally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        votes.iter().fold(Self::default(), |mut tally, vote| {
            if vote.support {
                tally.yes_votes += 1;
                tally.yes_weight += vote.weight;
            } else {
                tally.no_votes += 1;
                tally.no_weight += vote.weight;
            }
            tally
        })
    }

    pub fn total_votes(&self) -> usize {
        self.yes_votes + self.no_votes
    }

    pub fn total_weight(&self) -> f64 {
        self.yes_weight + self.no_weight
    }

    /// Share of weight in favour, or `None` with no weight cast.
    pub fn support_ratio(&self) -> Option<f64> {
        let total = self.total_weight();
        (total > 0.0).then(|| self.yes_weight / total)
    }

    /// Strict weighted majority in favour.
    pub fn passes(&self) -> bool {
        self.yes_weight > self.no_weight
    }
}
