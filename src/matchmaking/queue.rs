//! FIFO waitlist of players that are not yet paired

use crate::types::PlayerId;
use std::collections::VecDeque;
use tracing::debug;

/// Result of adding a player to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Player is waiting at this 1-based position
    Waiting { position: usize },
    /// The two oldest entries were dequeued and must be paired, oldest first
    Matched(PlayerId, PlayerId),
}

/// Ordered waitlist. Holds ids only; players are owned by the registry.
#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: VecDeque<PlayerId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `player_id` to the tail. Pairs the two oldest entries as soon as
    /// two players are waiting.
    pub fn enqueue(&mut self, player_id: &str) -> EnqueueResult {
        self.remove(player_id);
        self.waiting.push_back(player_id.to_string());

        if self.waiting.len() >= 2 {
            if let (Some(first), Some(second)) =
                (self.waiting.pop_front(), self.waiting.pop_front())
            {
                debug!("Queue paired '{}' with '{}'", first, second);
                return EnqueueResult::Matched(first, second);
            }
        }

        let position = self.waiting.len();
        debug!("Player '{}' waiting at position {}", player_id, position);
        EnqueueResult::Waiting { position }
    }

    /// Remove if present. Returns whether anything was removed.
    pub fn remove(&mut self, player_id: &str) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|id| id != player_id);
        self.waiting.len() != before
    }

    /// 1-based position of a waiting player
    pub fn position(&self, player_id: &str) -> Option<usize> {
        self.waiting
            .iter()
            .position(|id| id == player_id)
            .map(|idx| idx + 1)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.position(player_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_player_waits() {
        let mut queue = MatchQueue::new();
        assert_eq!(queue.enqueue("a"), EnqueueResult::Waiting { position: 1 });
        assert_eq!(queue.position("a"), Some(1));
    }

    #[test]
    fn test_second_player_triggers_match() {
        let mut queue = MatchQueue::new();
        queue.enqueue("a");
        assert_eq!(
            queue.enqueue("b"),
            EnqueueResult::Matched("a".to_string(), "b".to_string())
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut queue = MatchQueue::new();
        queue.enqueue("a");
        assert_eq!(queue.enqueue("a"), EnqueueResult::Waiting { position: 1 });
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut queue = MatchQueue::new();
        queue.enqueue("a");
        assert!(queue.remove("a"));
        assert!(!queue.remove("a"));
        assert!(!queue.remove("never-queued"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pairs_in_arrival_order() {
        let mut queue = MatchQueue::new();
        let mut pairs = Vec::new();
        for id in ["p1", "p2", "p3", "p4", "p5"] {
            if let EnqueueResult::Matched(a, b) = queue.enqueue(id) {
                pairs.push((a, b));
            }
        }

        assert_eq!(
            pairs,
            vec![
                ("p1".to_string(), "p2".to_string()),
                ("p3".to_string(), "p4".to_string()),
            ]
        );
        assert_eq!(queue.position("p5"), Some(1));
    }
}
