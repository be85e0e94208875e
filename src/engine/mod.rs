//! Engine state management.
//!
//! Holds the current board position, active power, engine options, and
//! runs search for the `go` command. Uses RM+ search at high strength
//! (>= 80) and Cartesian search otherwise.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::board::province::Power;
use crate::board::state::{BoardState, Phase};
use crate::eval::NeuralEvaluator;
use crate::opening_book::{self, BookMatchConfig, OpeningBook};
use crate::protocol::dfen::parse_dfen;
use crate::protocol::dson::format_orders;

pub mod plan;
use plan::{plan_build, plan_movement, plan_retreat};

/// Default search time in milliseconds.
const DEFAULT_MOVETIME_MS: u64 = 5000;

/// Default path for the opening book JSON file.
const DEFAULT_BOOK_PATH: &str = "data/processed/opening_book.json";

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    pub position: Option<BoardState>,
    pub active_power: Option<Power>,
    pub options: HashMap<String, String>,
    pub neural: Option<NeuralEvaluator>,
    book: Option<OpeningBook>,
    book_loaded: bool,
    rng: SmallRng,
}

impl Engine {
    /// Creates a new engine with no position or active power.
    pub fn new() -> Self {
        Engine {
            position: None,
            active_power: None,
            options: HashMap::new(),
            neural: None,
            book: None,
            book_loaded: false,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Resets all engine state for a new game.
    pub fn new_game(&mut self) {
        self.position = None;
        self.active_power = None;
    }

    /// Lazily loads the opening book from the configured BookPath (or default).
    fn ensure_book(&mut self) {
        if self.book_loaded {
            return;
        }
        self.book_loaded = true;
        let path_str = self
            .options
            .get("BookPath")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BOOK_PATH.to_string());
        if path_str.is_empty() {
            return;
        }
        let path = std::path::Path::new(&path_str);
        match opening_book::load_book(path) {
            Ok(b) => {
                eprintln!(
                    "info string loaded opening book ({} entries)",
                    b.entries.len()
                );
                self.book = Some(b);
            }
            Err(e) => {
                eprintln!("info string opening book not loaded: {}", e);
            }
        }
    }

    /// Lazily initializes the neural evaluator when ModelPath is first set.
    fn ensure_neural(&mut self) {
        if self.neural.is_some() {
            return;
        }
        let model_dir = match self.options.get("ModelPath") {
            Some(p) if !p.is_empty() => p.clone(),
            _ => return,
        };
        let policy_path = format!("{}/policy_v1.onnx", model_dir);
        let value_path = format!("{}/value_v1.onnx", model_dir);
        self.neural = Some(NeuralEvaluator::new(Some(&policy_path), Some(&value_path)));
    }

    /// Sets the current board position from a DFEN string.
    /// Returns an error message on failure.
    pub fn set_position(&mut self, dfen: &str) -> Result<(), String> {
        match parse_dfen(dfen) {
            Ok(state) => {
                self.position = Some(state);
                Ok(())
            }
            Err(e) => Err(format!("failed to parse DFEN: {}", e)),
        }
    }

    /// Sets the active power.
    pub fn set_power(&mut self, power: Power) {
        self.active_power = Some(power);
    }

    /// Sets an engine option.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        let reload_neural = name == "ModelPath";
        let reload_book = name == "BookPath";
        match value {
            Some(v) => {
                self.options.insert(name, v);
            }
            None => {
                self.options.insert(name, String::new());
            }
        }
        if reload_neural {
            self.neural = None; // force re-initialization
            self.ensure_neural();
        }
        if reload_book {
            self.book = None;
            self.book_loaded = false;
            self.ensure_book();
        }
    }

    /// Runs the movement phase search (RM+ or Cartesian based on strength)
    /// via the [`plan_movement`] boundary function.
    fn run_movement_search<W: Write>(
        &mut self,
        power: Power,
        out: &mut W,
    ) -> Vec<crate::board::Order> {
        let movetime = self.movetime();
        let strength = self.strength();
        let state = self.position.as_ref().unwrap();
        plan_movement(
            state,
            power,
            movetime,
            strength,
            self.neural.as_ref(),
            &mut self.rng,
            out,
        )
        .unwrap_or_default()
    }

    /// Returns the configured search time from options, or the default.
    fn movetime(&self) -> Duration {
        let ms = self
            .options
            .get("SearchTime")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MOVETIME_MS);
        Duration::from_millis(ms)
    }

    /// Returns true if the engine is configured for neural evaluation.
    #[allow(dead_code)]
    fn use_neural(&self) -> bool {
        let mode = self
            .options
            .get("EvalMode")
            .map(|s| s.as_str())
            .unwrap_or("heuristic");
        mode == "neural" || mode == "auto"
    }

    /// Handles the DUI handshake: writes id, options, protocol_version, and duiok.
    pub fn handle_dui<W: Write>(&self, out: &mut W) {
        writeln!(out, "id name statecraft").unwrap();
        writeln!(out, "id author statecraft contributors").unwrap();
        writeln!(out, "option name Threads type spin default 4 min 1 max 64").unwrap();
        writeln!(
            out,
            "option name SearchTime type spin default 5000 min 100 max 60000"
        )
        .unwrap();
        writeln!(
            out,
            "option name Strength type spin default 100 min 1 max 100"
        )
        .unwrap();
        writeln!(out, "option name ModelPath type string default models").unwrap();
        writeln!(
            out,
            "option name EvalMode type combo default heuristic var heuristic var neural var auto"
        )
        .unwrap();
        writeln!(
            out,
            "option name BookPath type string default {}",
            DEFAULT_BOOK_PATH
        )
        .unwrap();
        writeln!(out, "protocol_version 1").unwrap();
        writeln!(out, "duiok").unwrap();
        out.flush().unwrap();
    }

    /// Handles the `isready` command.
    pub fn handle_isready<W: Write>(&self, out: &mut W) {
        writeln!(out, "readyok").unwrap();
        out.flush().unwrap();
    }

    /// Returns the configured strength from options (default 100).
    fn strength(&self) -> u64 {
        self.options
            .get("Strength")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100)
    }

    /// Handles the `go` command. Uses RM+ search at high strength (>= 80)
    /// and Cartesian search otherwise. Retreat/build phases use heuristics.
    pub fn handle_go<W: Write>(&mut self, out: &mut W) {
        if let Err(e) = plan::require_position(self.position.as_ref()) {
            eprintln!("go: {}", e);
            return;
        }

        let power = match self.active_power {
            Some(p) => p,
            None => {
                eprintln!("go: no active power set");
                return;
            }
        };

        self.ensure_neural();
        self.ensure_book();

        // Try opening book lookup first (before borrowing self mutably for search).
        let book_hit = {
            let state = self.position.as_ref().unwrap();
            if state.phase == Phase::Movement {
                if let Some(ref book) = self.book {
                    let cfg = BookMatchConfig::default();
                    opening_book::lookup_opening(book, state, power, &cfg)
                } else {
                    None
                }
            } else {
                None
            }
        };

        let orders = if let Some(book_orders) = book_hit {
            let _ = writeln!(out, "info string opening book hit for {:?}", power);
            book_orders
        } else {
            let phase = self.position.as_ref().unwrap().phase;
            match phase {
                Phase::Movement => self.run_movement_search(power, out),
                Phase::Retreat => {
                    let state = self.position.as_ref().unwrap();
                    plan_retreat(state, power, &mut self.rng).unwrap_or_default()
                }
                Phase::Build => {
                    let state = self.position.as_ref().unwrap();
                    plan_build(state, power, &mut self.rng).unwrap_or_default()
                }
            }
        };

        let dson = format_orders(&orders);
        writeln!(out, "bestorders {}", dson).unwrap();
        out.flush().unwrap();
    }
}
