//! Leaderboard ordering shared by the public and participant services.

use crate::dao::models::ParticipantEntity;

/// A participant with its 1-based leaderboard position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub rank: usize,
    pub participant: ParticipantEntity,
}

/// Order participants by score, highest first.
///
/// `participants` must be in join order: the sort is stable, so ties keep
/// the earlier joiner ahead.
pub fn rank_participants(mut participants: Vec<ParticipantEntity>) -> Vec<Standing> {
    participants.sort_by(|a, b| b.score.cmp(&a.score));
    participants
        .into_iter()
        .enumerate()
        .map(|(index, participant)| Standing {
            rank: index + 1,
            participant,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn participant(username: &str, score: u32, joined: u64) -> ParticipantEntity {
        ParticipantEntity {
            username: username.into(),
            score,
            joined_at: UNIX_EPOCH + Duration::from_secs(joined),
        }
    }

    #[test]
    fn ties_keep_join_order() {
        let standings = rank_participants(vec![
            participant("zoe", 1, 1),
            participant("adam", 2, 2),
            participant("bob", 1, 3),
        ]);

        let order: Vec<_> = standings
            .iter()
            .map(|standing| (standing.rank, standing.participant.username.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "adam"), (2, "zoe"), (3, "bob")]);
    }

    #[test]
    fn empty_roster_has_no_standings() {
        assert!(rank_participants(Vec::new()).is_empty());
    }
}
