use serde::{Deserialize, Serialize};

use nata_types::{Address, Cid, ProposalId};

/// Default voting window: seven days.
pub const DEFAULT_VOTING_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// A governance proposal open for voting during `[start_time, end_time]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub proposer: Address,
    pub start_time: u64,
    pub end_time: u64,
    /// Identifier of the persisted proposal text, when one was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
}

impl Proposal {
    /// Whether `now` falls inside the inclusive voting window.
    pub fn is_open_at(&self, now: u64) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

/// A single ballot on a proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub proposal_id: ProposalId,
    pub voter: Address,
    pub support: bool,
    pub weight: f64,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(start: u64, end: u64) -> Proposal {
        Proposal {
            id: ProposalId::new(),
            title: "Solar panels".into(),
            description: "Install on the community hall".into(),
            proposer: Address::from("0xabc"),
            start_time: start,
            end_time: end,
            cid: None,
        }
    }

    #[test]
    fn window_is_inclusive() {
        let p = proposal(100, 200);
        assert!(!p.is_open_at(99));
        assert!(p.is_open_at(100));
        assert!(p.is_open_at(200));
        assert!(!p.is_open_at(201));
    }

    #[test]
    fn proposal_json_uses_camel_case() {
        let json = serde_json::to_value(proposal(1, 2)).unwrap();
        assert_eq!(json["startTime"], 1);
        assert_eq!(json["endTime"], 2);
        assert!(json.get("cid").is_none());
    }

    #[test]
    fn vote_json_shape() {
        let vote = Vote {
            proposal_id: ProposalId::new(),
            voter: Address::from("0xBEEF"),
            support: true,
            weight: 2.5,
            timestamp: 42,
        };
        let json = serde_json::to_value(&vote).unwrap();
        assert_eq!(json["voter"], "0xBEEF");
        assert_eq!(json["weight"], 2.5);
        assert!(json["proposalId"].as_str().unwrap().starts_with("prop_"));
    }

    #[test]
    fn default_duration_is_a_week() {
        assert_eq!(DEFAULT_VOTING_DURATION_SECS, 604_800);
    }
}
