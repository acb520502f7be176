//! Progress & gate evaluation.
//!
//! Pure functions over team and hunt state; the service layer feeds them with
//! live reads so gate decisions never rely on stale snapshots.

use crate::dao::models::{AccusationEntity, ClueEntity, EvidenceEntity, MysteryEntity, TeamEntity};

/// The clue a team should currently be working on: the lowest `order_index`
/// clue whose id is not in the team's completed set. `None` means the team
/// has completed the sequence.
pub fn current_clue<'a>(team: &TeamEntity, clues: &'a [ClueEntity]) -> Option<&'a ClueEntity> {
    clues
        .iter()
        .filter(|clue| !team.has_completed(clue.id))
        .min_by_key(|clue| clue.order_index)
}

/// Whether a team has completed the whole sequence.
///
/// A completed set larger than the live clue count (clues deleted after
/// completion) counts as fully complete, never as an error.
pub fn is_sequence_complete(team: &TeamEntity, total_clues: usize) -> bool {
    total_clues > 0 && team.completed_clue_ids.len() >= total_clues
}

/// Whether the mystery content is visible to a team: staff switch on and the
/// trigger clue (when configured) completed.
pub fn is_mystery_unlocked(team: &TeamEntity, mystery: &MysteryEntity) -> bool {
    mystery.active
        && mystery
            .trigger_clue_id
            .is_none_or(|trigger| team.has_completed(trigger))
}

/// Whether the mystery gate is open for action: the content is unlocked and
/// the team has not already resolved it with an accusation.
pub fn is_mystery_open(
    team: &TeamEntity,
    mystery: &MysteryEntity,
    accusation: Option<&AccusationEntity>,
) -> bool {
    is_mystery_unlocked(team, mystery) && accusation.is_none()
}

/// Whether the finale gate is open: every clue completed and the manual staff
/// grant present. A hunt with zero clues has no finale.
pub fn is_finale_open(team: &TeamEntity, total_clues: usize) -> bool {
    is_sequence_complete(team, total_clues) && team.gate_flags.finale_approved
}

/// Evidence items a team has unlocked: ungated items plus those whose gating
/// clue the team has completed.
pub fn unlocked_evidence<'a>(
    team: &TeamEntity,
    mystery: &'a MysteryEntity,
) -> Vec<&'a EvidenceEntity> {
    mystery
        .evidence
        .iter()
        .filter(|item| {
            item.unlock_clue_id
                .is_none_or(|clue_id| team.has_completed(clue_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{AnswerKind, VictimEntity};
    use std::time::SystemTime;
    use uuid::Uuid;

    fn clue(order_index: u32) -> ClueEntity {
        ClueEntity {
            id: Uuid::new_v4(),
            order_index,
            title: format!("Clue {order_index}"),
            body: "body".into(),
            answer_kind: AnswerKind::Text,
            expected_answer: "answer".into(),
            image_url: None,
            created_at: SystemTime::now(),
        }
    }

    fn team() -> TeamEntity {
        TeamEntity::new("The Owls".into(), "123456".into())
    }

    fn mystery(active: bool, trigger: Option<Uuid>) -> MysteryEntity {
        MysteryEntity {
            active,
            trigger_clue_id: trigger,
            revealed: false,
            revealed_at: None,
            victim: VictimEntity {
                name: "Reginald".into(),
                photo_url: "https://example.com/reginald.jpg".into(),
                age: 61,
                occupation: "Archivist".into(),
                bio: "Kept the estate's secrets".into(),
                last_seen: "The library".into(),
            },
            suspects: Vec::new(),
            evidence: Vec::new(),
        }
    }

    fn accusation(team_id: Uuid) -> AccusationEntity {
        AccusationEntity {
            id: Uuid::new_v4(),
            team_id,
            suspect_id: Uuid::new_v4(),
            reasoning: None,
            correct: false,
            submitted_at: SystemTime::now(),
        }
    }

    #[test]
    fn current_clue_is_lowest_incomplete_index() {
        let clues = vec![clue(0), clue(1), clue(5)];
        let mut team = team();

        assert_eq!(current_clue(&team, &clues).unwrap().id, clues[0].id);

        team.complete_clue(clues[0].id);
        assert_eq!(current_clue(&team, &clues).unwrap().id, clues[1].id);

        team.complete_clue(clues[1].id);
        team.complete_clue(clues[2].id);
        assert!(current_clue(&team, &clues).is_none());
    }

    #[test]
    fn current_clue_never_returns_a_completed_clue() {
        let clues = vec![clue(0), clue(1), clue(2)];
        let mut team = team();
        // Complete out of order; the evaluator must skip back to the gap.
        team.complete_clue(clues[0].id);
        team.complete_clue(clues[2].id);

        let current = current_clue(&team, &clues).unwrap();
        assert_eq!(current.id, clues[1].id);
        assert!(!team.has_completed(current.id));
    }

    #[test]
    fn sequence_with_gaps_in_order_indexes_still_advances() {
        let clues = vec![clue(10), clue(20), clue(40)];
        let mut team = team();
        team.complete_clue(clues[0].id);
        assert_eq!(current_clue(&team, &clues).unwrap().order_index, 20);
    }

    #[test]
    fn finale_needs_all_clues_and_the_staff_grant() {
        let mut team = team();
        let clues = vec![clue(0), clue(1), clue(2)];
        team.complete_clue(clues[0].id);
        team.complete_clue(clues[1].id);
        team.gate_flags.finale_approved = true;

        // Two of three completed: closed even with the grant.
        assert!(!is_finale_open(&team, clues.len()));

        team.complete_clue(clues[2].id);
        assert!(is_finale_open(&team, clues.len()));

        // Grant withdrawn: closed again.
        team.gate_flags.finale_approved = false;
        assert!(!is_finale_open(&team, clues.len()));
    }

    #[test]
    fn zero_clues_means_no_finale() {
        let mut team = team();
        team.gate_flags.finale_approved = true;
        assert!(!is_finale_open(&team, 0));
    }

    #[test]
    fn overcomplete_team_counts_as_finished() {
        let mut team = team();
        for _ in 0..4 {
            team.complete_clue(Uuid::new_v4());
        }
        // Clues were deleted after completion; only 2 remain.
        assert!(is_sequence_complete(&team, 2));
        team.gate_flags.finale_approved = true;
        assert!(is_finale_open(&team, 2));
    }

    #[test]
    fn mystery_gate_follows_trigger_and_active_switch() {
        let mut team = team();
        let trigger = Uuid::new_v4();

        let inactive = mystery(false, Some(trigger));
        assert!(!is_mystery_open(&team, &inactive, None));

        let gated = mystery(true, Some(trigger));
        assert!(!is_mystery_open(&team, &gated, None));

        team.complete_clue(trigger);
        assert!(is_mystery_open(&team, &gated, None));

        let untriggered = mystery(true, None);
        assert!(is_mystery_open(&team, &untriggered, None));
    }

    #[test]
    fn recorded_accusation_closes_the_mystery_gate() {
        let team = team();
        let open = mystery(true, None);
        let recorded = accusation(team.id);

        assert!(is_mystery_open(&team, &open, None));
        assert!(!is_mystery_open(&team, &open, Some(&recorded)));
        // Visibility is unaffected; only the action gate closes.
        assert!(is_mystery_unlocked(&team, &open));
    }

    #[test]
    fn evidence_unlocks_with_completed_clues() {
        let mut team = team();
        let gating_clue = Uuid::new_v4();
        let mut m = mystery(true, None);
        m.evidence = vec![
            EvidenceEntity {
                id: Uuid::new_v4(),
                title: "Torn letter".into(),
                description: "Half a signature".into(),
                image_url: None,
                found_at: "The study".into(),
                unlock_clue_id: None,
                related_suspect_id: None,
            },
            EvidenceEntity {
                id: Uuid::new_v4(),
                title: "Muddy boots".into(),
                description: "Size eleven".into(),
                image_url: None,
                found_at: "The greenhouse".into(),
                unlock_clue_id: Some(gating_clue),
                related_suspect_id: None,
            },
        ];

        assert_eq!(unlocked_evidence(&team, &m).len(), 1);
        team.complete_clue(gating_clue);
        assert_eq!(unlocked_evidence(&team, &m).len(), 2);
    }
}
