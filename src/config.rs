//! Tunables for every strategy. Each section deserializes with defaults, so a
//! JSON file only needs the fields it overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub ids: IdsConfig,
    pub simple_hill_climbing: HillClimbingConfig,
    pub steepest_hill_climbing: HillClimbingConfig,
    pub stochastic_hill_climbing: StochasticConfig,
    pub annealing: AnnealingConfig,
    pub beam: BeamConfig,
    pub genetic: GeneticConfig,
    pub backtracking: BacktrackingConfig,
    pub ac3: Ac3Config,
    pub generate_and_test: GenerateTestConfig,
    pub and_or: AndOrConfig,
    pub no_observation: NoObservationConfig,
    pub partial_observation: PartialObservationConfig,
    pub q_learning: QLearningConfig,
    pub scramble: ScrambleConfig,
}

impl SearchConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| PuzzleError::Io {
            operation: format!("read config {}", path.display()),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    /// Rounds run with depth bounds `0..max_depth`.
    pub max_depth: u32,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingConfig {
    pub max_restarts: u32,
    pub max_steps: u32,
    /// Restarts begin with a random walk of 1..=perturb_moves slides.
    pub perturb_moves: u32,
}

impl Default for HillClimbingConfig {
    fn default() -> Self {
        Self {
            max_restarts: 50,
            max_steps: 1000,
            perturb_moves: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticConfig {
    pub max_restarts: u32,
    pub max_steps: u32,
    pub perturb_moves: u32,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            max_restarts: 200,
            max_steps: 1000,
            perturb_moves: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    /// Below this the schedule reheats to `reheat_temperature`.
    pub min_temperature: f64,
    pub reheat_temperature: f64,
    pub max_stagnant: u32,
    pub max_iterations: u32,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            cooling_rate: 0.995,
            min_temperature: 0.1,
            reheat_temperature: 50.0,
            max_stagnant: 200,
            max_iterations: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub width: usize,
    pub max_iterations: u32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            width: 4,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub max_generations: u32,
    pub mutation_rate: f64,
    /// Seed individuals are random walks of this many slides from the start.
    pub min_seed_moves: u32,
    pub max_seed_moves: u32,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_generations: 1000,
            mutation_rate: 0.1,
            min_seed_moves: 5,
            max_seed_moves: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktrackingConfig {
    pub max_depth: u32,
    pub max_expansions: u64,
}

impl Default for BacktrackingConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_expansions: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ac3Config {
    /// Number of layer variables in the constraint graph.
    pub max_depth: usize,
    pub max_states_per_layer: usize,
}

impl Default for Ac3Config {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_states_per_layer: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateTestConfig {
    pub max_steps: u32,
    pub max_restarts: u32,
    pub perturb_moves: u32,
}

impl Default for GenerateTestConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            max_restarts: 10,
            perturb_moves: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndOrConfig {
    pub timeout_ms: u64,
    pub max_iterations: u32,
}

impl AndOrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AndOrConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            max_iterations: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoObservationConfig {
    pub max_expansions: u32,
    pub max_belief_size: usize,
    /// Beliefs whose heuristic exceeds this multiple of the initial one are pruned.
    pub heuristic_factor: u32,
}

impl Default for NoObservationConfig {
    fn default() -> Self {
        Self {
            max_expansions: 2000,
            max_belief_size: 50,
            heuristic_factor: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialObservationConfig {
    pub max_expansions: u32,
}

impl Default for PartialObservationConfig {
    fn default() -> Self {
        Self { max_expansions: 100_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub episodes: u32,
    pub max_steps: u32,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    pub q_init: f64,
    /// Step cap for the greedy rollout after training.
    pub rollout_steps: u32,
    pub goal_reward: f64,
    pub improve_reward: f64,
    pub worsen_reward: f64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            episodes: 5000,
            max_steps: 100,
            learning_rate: 0.1,
            discount_factor: 0.99,
            epsilon: 1.0,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
            q_init: 0.0,
            rollout_steps: 200,
            goal_reward: 100.0,
            improve_reward: 1.0,
            worsen_reward: -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrambleConfig {
    pub moves: u32,
    pub max_attempts: u32,
}

impl Default for ScrambleConfig {
    fn default() -> Self {
        Self {
            moves: 20,
            max_attempts: 100,
        }
    }
}
