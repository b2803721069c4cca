use std::collections::VecDeque;

use crate::pipeline::PredictionOutcome;
use crate::resources;
use crate::sample_data;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Player,
    Season,
    Opponent,
}

pub struct AppState {
    pub seasons: Vec<String>,
    pub season_idx: usize,
    pub player_input: String,
    pub opponents: Vec<String>,
    pub opponent_idx: usize,
    pub focus: Focus,
    pub outcome: Option<PredictionOutcome>,
    pub error_banner: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            seasons: resources::season_choices(),
            season_idx: 0,
            player_input: String::new(),
            opponents: sample_data::team_abbreviations(),
            opponent_idx: 0,
            focus: Focus::Player,
            outcome: None,
            error_banner: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
        }
    }

    pub fn season(&self) -> &str {
        self.seasons
            .get(self.season_idx)
            .map(|s| s.as_str())
            .unwrap_or("2023-24")
    }

    pub fn opponent(&self) -> &str {
        self.opponents
            .get(self.opponent_idx)
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Player => Focus::Season,
            Focus::Season => Focus::Opponent,
            Focus::Opponent => Focus::Player,
        };
    }

    /// Move the focused selector. The player field has no selection, so the
    /// call is a no-op there.
    pub fn select_prev(&mut self) {
        match self.focus {
            Focus::Player => {}
            Focus::Season => {
                if !self.seasons.is_empty() {
                    self.season_idx = self
                        .season_idx
                        .checked_sub(1)
                        .unwrap_or(self.seasons.len() - 1);
                }
            }
            Focus::Opponent => {
                if !self.opponents.is_empty() {
                    self.opponent_idx = self
                        .opponent_idx
                        .checked_sub(1)
                        .unwrap_or(self.opponents.len() - 1);
                }
            }
        }
    }

    pub fn select_next(&mut self) {
        match self.focus {
            Focus::Player => {}
            Focus::Season => {
                if !self.seasons.is_empty() {
                    self.season_idx = (self.season_idx + 1) % self.seasons.len();
                }
            }
            Focus::Opponent => {
                if !self.opponents.is_empty() {
                    self.opponent_idx = (self.opponent_idx + 1) % self.opponents.len();
                }
            }
        }
    }

    /// Swap in the opponent choices from a loaded season's team table,
    /// keeping the current selection by value when it survives the swap.
    pub fn set_opponents(&mut self, abbrs: Vec<String>) {
        if abbrs.is_empty() {
            return;
        }
        let current = self.opponent().to_string();
        self.opponent_idx = abbrs.iter().position(|a| *a == current).unwrap_or(0);
        self.opponents = abbrs;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_ring_is_bounded() {
        let mut state = AppState::new();
        for i in 0..500 {
            state.push_log(format!("line {i}"));
        }
        assert_eq!(state.logs.len(), 200);
        assert_eq!(state.logs.back().map(|s| s.as_str()), Some("line 499"));
    }

    #[test]
    fn focus_cycles_through_all_fields() {
        let mut state = AppState::new();
        assert_eq!(state.focus, Focus::Player);
        state.cycle_focus();
        assert_eq!(state.focus, Focus::Season);
        state.cycle_focus();
        assert_eq!(state.focus, Focus::Opponent);
        state.cycle_focus();
        assert_eq!(state.focus, Focus::Player);
    }

    #[test]
    fn selectors_wrap_in_both_directions() {
        let mut state = AppState::new();
        state.focus = Focus::Opponent;
        state.select_prev();
        assert_eq!(state.opponent_idx, state.opponents.len() - 1);
        state.select_next();
        assert_eq!(state.opponent_idx, 0);
    }

    #[test]
    fn set_opponents_keeps_selection_by_value() {
        let mut state = AppState::new();
        state.focus = Focus::Opponent;
        let bos = state
            .opponents
            .iter()
            .position(|a| a == "BOS")
            .expect("BOS in defaults");
        state.opponent_idx = bos;
        state.set_opponents(vec!["ATL".to_string(), "BOS".to_string()]);
        assert_eq!(state.opponent(), "BOS");
    }
}
