//! # Board Writer
//!
//! The single writer of `matches:list`. Match tasks send their snapshot after
//! every tick; the writer folds whatever has queued up into its board and writes
//! the list once per batch. The board lags the individual match keys by at most
//! one tick.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::publisher::FeedPublisher;
use crate::model::Match;

pub type BoardSender = mpsc::UnboundedSender<Match>;

/// Matches in creation order, each at its latest known snapshot.
#[derive(Debug, Default)]
pub struct Board {
    order: Vec<String>,
    latest: HashMap<String, Match>,
}

impl Board {
    pub fn new(matches: impl IntoIterator<Item = Match>) -> Self {
        let mut board = Self::default();
        for state in matches {
            board.update(state);
        }
        board
    }

    pub fn update(&mut self, state: Match) {
        if !self.latest.contains_key(&state.id) {
            self.order.push(state.id.clone());
        }
        self.latest.insert(state.id.clone(), state);
    }

    pub fn snapshot(&self) -> Vec<Match> {
        self.order
            .iter()
            .filter_map(|id| self.latest.get(id).cloned())
            .collect()
    }
}

/// Spawns the writer. It exits once every sender has been dropped and the queue
/// is drained.
pub fn spawn_board_writer(mut board: Board, publisher: FeedPublisher) -> (BoardSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Match>();

    let handle = tokio::spawn(async move {
        while let Some(state) = rx.recv().await {
            board.update(state);
            while let Ok(state) = rx.try_recv() {
                board.update(state);
            }
            publisher.record_board(&board.snapshot()).await;
        }
        debug!("Board writer stopped");
    });

    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_creation_order_and_latest_state() {
        let a = Match::with_id("a", "Lions", "Tigers");
        let b = Match::with_id("b", "Bears", "Wolves");
        let mut board = Board::new([a.clone(), b.clone()]);

        let mut a2 = a.clone();
        a2.minute = 7;
        board.update(a2.clone());

        let ids: Vec<_> = board.snapshot().into_iter().map(|m| (m.id, m.minute)).collect();
        assert_eq!(ids, vec![("a".to_string(), 7), ("b".to_string(), 0)]);
    }
}
