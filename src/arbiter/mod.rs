mod options;

use std::io::{BufRead, Write};
use std::process::exit;
use std::time::Duration;

use itertools::Itertools;
pub use options::ArbiterOptions;

use crate::agent::{AiLimit, DvonnAgent};
use crate::dvonn::prelude::*;

/// One game session against the arbiter's line protocol: the first input
/// line is either `Start` (we open as White) or the opponent's first move
/// (we answer as Black); afterwards moves alternate one per line, and
/// `Quit` ends the process.
pub struct ArbiterSession {
    agent: DvonnAgent,
    options: ArbiterOptions,
}

impl ArbiterSession {
    pub fn new(options: ArbiterOptions) -> Result<ArbiterSession> {
        if options.color.is_some_and(|mask| mask > 3) {
            return Err(anyhow!("--color expects a bitmask of 0..3"));
        }
        let config = options.search_config()?;
        log::info!("RNG seed {}.", config.seed);
        log::info!(
            "{:.3} MB transposition table is {}abled.",
            ((1u64 << config.tt_bits) * std::mem::size_of::<crate::agent::TtEntry>() as u64)
                as f64
                / 1024.0
                / 1024.0,
            if config.tt_bits > 0 { "en" } else { "dis" }
        );
        log::info!("move ordering: {:?}, killer level {}.", config.mo, config.killer);

        let mut agent = DvonnAgent::new(config)?;
        if let Some(descr) = &options.state {
            let state: StateString = descr
                .parse()
                .with_context(|| format!("couldn't parse game description `{descr}`"))?;
            #[cfg(debug_assertions)]
            state.board.validate();
            agent.set_board(state.board);
        }
        Ok(ArbiterSession { agent, options })
    }

    pub fn run(&mut self) -> Result<()> {
        if self.options.analyze {
            self.analyze()
        } else {
            self.play_session()
        }
    }

    /// One-shot analysis of a loaded position: log the static value,
    /// print the selected move, log the principal variation.
    fn analyze(&mut self) -> Result<()> {
        let descr = self
            .options
            .state
            .clone()
            .ok_or_else(|| anyhow!("--analyze requires --state"))?;
        let state: StateString = descr.parse()?;

        let (value, _) = self.agent.evaluate();
        log::info!("intermediate value: {value}");
        if state.next_player.is_none() {
            log::error!("Game already finished!");
            return Ok(());
        }

        let result = self.agent.select_move(&self.options.ai_limit())?;
        let mv = result.mv.ok_or_else(|| anyhow!("no move selected"))?;
        let pv = self.agent.principal_variation(result.depth.max(1) as usize);
        log::info!(
            "value {} at depth {}; pv: {}",
            result.value,
            result.depth,
            pv.iter().map(|m| m.to_string()).join("; ")
        );

        println!("{mv}");
        std::io::stdout().flush()?;
        self.agent.play(mv)?;
        log::info!("new state: {}", self.agent.board().notate());
        Ok(())
    }

    fn play_session(&mut self) -> Result<()> {
        let first = self.read_line()?;
        let mut my_mask = self.options.color.unwrap_or(0);
        if first == "Start" {
            if my_mask == 0 {
                my_mask = 1;
            }
        } else {
            log::debug!("<--{first}--");
            self.execute_peer_move(&first)?;
            if my_mask == 0 {
                my_mask = 2;
            }
        }

        loop {
            log::debug!("state {}", self.agent.board().notate());
            log::trace!("board\n{}", self.agent.board().pretty());
            if self.agent.board().game_over() {
                // Nothing left to play; the arbiter follows up with Quit.
                let line = self.read_line()?;
                return Err(anyhow!("unexpected input after game end: {line}"));
            }
            let side_bit = match self.agent.board().next_player() {
                Player::White => 1,
                Player::Black => 2,
            };
            if my_mask & side_bit != 0 {
                let result = self.agent.select_move(&self.limit())?;
                let mv = result.mv.ok_or_else(|| anyhow!("no move selected"))?;
                log::info!(
                    "value {} at depth {} ({} positions, {:.3}s{})",
                    result.value,
                    result.depth,
                    result.evaluated,
                    result.time.as_secs_f64(),
                    if result.aborted { ", aborted" } else { "" }
                );
                log::debug!(" --{mv}-->");
                println!("{mv}");
                std::io::stdout().flush()?;
                self.agent.play(mv)?;
            } else {
                let line = self.read_line()?;
                log::debug!("<--{line}--");
                self.execute_peer_move(&line)?;
            }
        }
    }

    /// Validates and executes a move received from the arbiter. The
    /// arbiter is trusted in tournaments, so a failure here is fatal.
    fn execute_peer_move(&mut self, line: &str) -> Result<()> {
        let mv: Move = line
            .parse()
            .with_context(|| format!("could not parse move {line}"))?;
        self.agent
            .play(mv)
            .with_context(|| format!("invalid move {line}"))
    }

    /// Per-move stop conditions: whatever is left of the per-side time
    /// budget, plus any fixed depth or evaluation cap.
    fn limit(&self) -> AiLimit {
        let mut limit = self.options.ai_limit();
        if let Some(total) = limit.time {
            let left = total.saturating_sub(self.agent.time_used());
            limit.time = Some(left.max(Duration::from_millis(10)));
        }
        limit
    }

    /// Reads the next non-empty line, pausing the engine clock while the
    /// opponent thinks. `Quit` terminates the process; the game server
    /// sends the result in human-readable form on one further line.
    fn read_line(&mut self) -> Result<String> {
        self.agent.pause_clock();
        let mut line = String::new();
        loop {
            line.clear();
            if std::io::stdin().lock().read_line(&mut line)? == 0 {
                return Err(anyhow!("unexpected end of input"));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "Quit" {
                let mut result = String::new();
                if std::io::stdin().lock().read_line(&mut result).unwrap_or(0) > 0 {
                    log::info!("{}", result.trim());
                }
                exit(0);
            }
            self.agent.resume_clock();
            return Ok(trimmed.to_owned());
        }
    }
}
