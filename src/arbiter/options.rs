use std::time::Duration;

use clap::Parser;

use crate::agent::{
    AiLimit, DeepeningStep, EvalWeights, FieldWeights, MoveOrderMode, SearchConfig,
};
use crate::utils::prelude::*;

/// Default per-side wall-time budget, in seconds.
const DEFAULT_TIME: f64 = 5.0;
/// Default fixed depth for one-shot analysis.
const DEFAULT_ANALYZE_DEPTH: u16 = 4;

#[derive(Clone, Debug, Parser)]
#[command(name = "dvonn", about = "A tournament engine for the board game Dvonn.")]
pub struct ArbiterOptions {
    /// Log level filter for the stderr diagnostics.
    #[arg(long)]
    pub log_level: Option<String>,

    /// RNG seed; derived from the process id and wall time when absent.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Initial position as a 50-character state string.
    #[arg(long)]
    pub state: Option<String>,

    /// Bitmask of the colours to play: 1 white, 2 black, 3 both.
    /// Inferred from the first input line when absent.
    #[arg(long)]
    pub color: Option<u8>,

    /// Evaluate the given --state once, print move and PV, then exit.
    #[arg(long, default_value_t = false)]
    pub analyze: bool,

    /// Maximum search depth.
    #[arg(long)]
    pub depth: Option<u16>,

    /// Maximum number of evaluated positions per search.
    #[arg(long)]
    pub eval: Option<u64>,

    /// Wall-time budget per side, in seconds.
    #[arg(long)]
    pub time: Option<f64>,

    /// Transposition table of 2^k entries, k in 10..28; 0 disables it.
    #[arg(long)]
    pub tt: Option<u32>,

    /// Linear probe cap on table collisions (max 16); 0 keeps the table
    /// direct-mapped.
    #[arg(long)]
    pub tt_probe: Option<usize>,

    /// Move ordering: 0 off, 1 heuristic, 2 evaluated.
    #[arg(long)]
    pub mo: Option<u8>,

    /// Killer moves: 0 off, 1 table killers, 2 adds per-ply killers.
    #[arg(long)]
    pub killer: Option<u8>,

    /// Principal-variation search: 0 off, 1 on.
    #[arg(long)]
    pub pvs: Option<u8>,

    /// MTD(f) driver instead of full-window deepening: 0 off, 1 on.
    #[arg(long)]
    pub mtdf: Option<u8>,

    /// Iterative-deepening step: 1 or 2.
    #[arg(long)]
    pub deep: Option<u8>,

    /// Evaluation weights as stacks:moves:to_life:to_enemy.
    #[arg(long)]
    pub weights: Option<String>,

    /// Field-value table parameters as base:bonus:shift.
    #[arg(long)]
    pub wfields: Option<String>,
}

impl ArbiterOptions {
    /// Produces the immutable search configuration the engine runs with.
    pub fn search_config(&self) -> Result<SearchConfig> {
        let mut config = SearchConfig::default();

        if let Some(k) = self.tt {
            if k != 0 && !(10..=28).contains(&k) {
                return Err(anyhow!("--tt expects 0 or a value in 10..28, received {k}"));
            }
            config.tt_bits = k;
        }
        if let Some(probe) = self.tt_probe {
            if probe > 16 {
                return Err(anyhow!("--tt-probe expects at most 16, received {probe}"));
            }
            config.tt_probe = probe;
        }
        if let Some(mo) = self.mo {
            config.mo = match mo {
                0 => MoveOrderMode::Off,
                1 => MoveOrderMode::Heuristic,
                2 => MoveOrderMode::Evaluated,
                _ => return Err(anyhow!("--mo expects 0, 1 or 2, received {mo}")),
            };
        }
        if let Some(killer) = self.killer {
            if killer > 2 {
                return Err(anyhow!("--killer expects 0, 1 or 2, received {killer}"));
            }
            config.killer = killer;
        }
        if let Some(pvs) = self.pvs {
            config.use_pvs = toggle("--pvs", pvs)?;
        }
        if let Some(mtdf) = self.mtdf {
            config.use_mtdf = toggle("--mtdf", mtdf)?;
        }
        if let Some(deep) = self.deep {
            config.deepening = match deep {
                1 => DeepeningStep::One,
                2 => DeepeningStep::Two,
                _ => return Err(anyhow!("--deep expects 1 or 2, received {deep}")),
            };
        }
        if let Some(weights) = &self.weights {
            config.weights = parse_weights(weights)?;
        }
        if let Some(wfields) = &self.wfields {
            config.wfields = Some(parse_wfields(wfields)?);
        }
        config.seed = self.seed.unwrap_or_else(default_seed);
        Ok(config)
    }

    /// The stop conditions for one move selection. Interactive play runs
    /// against the wall clock by default; analysis runs at a fixed depth
    /// like the tools that consume its output expect.
    pub fn ai_limit(&self) -> AiLimit {
        // Only positive limits count as stop conditions.
        let time = self
            .time
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(Duration::from_secs_f64);
        if self.analyze {
            AiLimit {
                depth: Some(self.depth.unwrap_or(DEFAULT_ANALYZE_DEPTH)),
                eval: self.eval,
                time,
            }
        } else {
            AiLimit {
                depth: self.depth,
                eval: self.eval,
                time: Some(time.unwrap_or(Duration::from_secs_f64(DEFAULT_TIME))),
            }
        }
    }
}

fn toggle(flag: &str, value: u8) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(anyhow!("{flag} expects 0 or 1, received {value}")),
    }
}

fn parse_weights(s: &str) -> Result<EvalWeights> {
    let parts = split_ints(s)?;
    if parts.len() != 4 {
        return Err(anyhow!("--weights expects stacks:moves:to_life:to_enemy, received {s}"));
    }
    Ok(EvalWeights { stacks: parts[0], moves: parts[1], to_life: parts[2], to_enemy: parts[3] })
}

fn parse_wfields(s: &str) -> Result<FieldWeights> {
    let parts = split_ints(s)?;
    if parts.len() != 3 {
        return Err(anyhow!("--wfields expects base:bonus:shift, received {s}"));
    }
    if parts[2] < 0 {
        return Err(anyhow!("--wfields shift must not be negative"));
    }
    Ok(FieldWeights { base: parts[0], bonus: parts[1], shift: parts[2] as u32 })
}

fn split_ints(s: &str) -> Result<Vec<i32>> {
    s.split(':')
        .map(|part| {
            part.parse::<i32>()
                .with_context(|| format!("invalid integer `{part}` in {s}"))
        })
        .collect()
}

fn default_seed() -> u64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    (1337 * std::process::id() as u64 + 17 * now) % 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ArbiterOptions {
        let mut argv = vec!["dvonn"];
        argv.extend_from_slice(args);
        ArbiterOptions::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_survive_an_empty_command_line() {
        let config = parse(&[]).search_config().unwrap();
        assert_eq!(config.tt_bits, 21);
        assert_eq!(config.mo, MoveOrderMode::Heuristic);
        assert!(config.use_pvs);
        assert!(!config.use_mtdf);
    }

    #[test]
    fn flags_map_onto_the_config() {
        let options = parse(&[
            "--tt=12",
            "--mo=2",
            "--killer=2",
            "--pvs=0",
            "--mtdf=1",
            "--deep=2",
            "--seed=42",
            "--weights=90:30:10:15",
            "--wfields=80:64:1",
        ]);
        let config = options.search_config().unwrap();
        assert_eq!(config.tt_bits, 12);
        assert_eq!(config.mo, MoveOrderMode::Evaluated);
        assert_eq!(config.killer, 2);
        assert!(!config.use_pvs);
        assert!(config.use_mtdf);
        assert_eq!(config.deepening, DeepeningStep::Two);
        assert_eq!(config.seed, 42);
        assert_eq!(
            config.weights,
            EvalWeights { stacks: 90, moves: 30, to_life: 10, to_enemy: 15 }
        );
        assert_eq!(config.wfields, Some(FieldWeights { base: 80, bonus: 64, shift: 1 }));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(parse(&["--tt=9"]).search_config().is_err());
        assert!(parse(&["--tt=29"]).search_config().is_err());
        assert!(parse(&["--mo=3"]).search_config().is_err());
        assert!(parse(&["--pvs=2"]).search_config().is_err());
        assert!(parse(&["--deep=3"]).search_config().is_err());
        assert!(parse(&["--weights=1:2:3"]).search_config().is_err());
    }

    #[test]
    fn game_play_defaults_to_a_time_budget() {
        let limit = parse(&[]).ai_limit();
        assert_eq!(limit.time, Some(Duration::from_secs_f64(5.0)));
        assert_eq!(limit.depth, None);

        let analyze = parse(&["--analyze"]).ai_limit();
        assert_eq!(analyze.depth, Some(4));
        assert_eq!(analyze.time, None);
    }
}
