//! Offline training of pursuit move sequences.
//!
//! The trainer runs many generations of the genetic search outside the
//! real-time loop: tournament selection, multi-point crossover, three
//! mutation operators and partial elitism, with early stopping once the best
//! fitness stalls. The winning sequence is written to a JSON file that an
//! agent can load at construction to seed its population.

use crate::config::TrainingConfig;
use crate::error::TrainingError;
use crate::grid::{Direction, Grid, Tile};
use crate::search::genetic::{pursuit_fitness, Candidate, GeneSequence};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted result of a training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedSequence {
    pub agent_id: u32,
    pub genes: GeneSequence,
    pub fitness: f64,
    pub generations: u32,
}

impl TrainedSequence {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainingError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let contents = std::fs::read_to_string(path)?;
        let sequence: TrainedSequence = serde_json::from_str(&contents)?;
        if sequence.genes.is_empty() {
            return Err(TrainingError::Invalid("empty gene sequence".into()));
        }
        Ok(sequence)
    }

    /// Load a sequence if the file exists and parses; otherwise `None`
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(sequence) => {
                log::info!(
                    "Loaded trained sequence for agent {} ({} genes) from {}",
                    sequence.agent_id,
                    sequence.genes.len(),
                    path.display()
                );
                Some(sequence)
            }
            Err(e) => {
                log::debug!("No trained sequence at {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Outcome of [`Trainer::run`]
#[derive(Clone, Debug)]
pub struct TrainingReport {
    pub best: Candidate,
    /// Best fitness of each evaluated generation
    pub history: Vec<f64>,
    pub generations: u32,
    pub early_stopped: bool,
}

impl TrainingReport {
    pub fn to_trained(&self, agent_id: u32) -> TrainedSequence {
        TrainedSequence {
            agent_id,
            genes: self.best.genes.clone(),
            fitness: self.best.fitness,
            generations: self.generations,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Generations: {} | Best fitness: {:.2} | Early stop: {}",
            self.generations, self.best.fitness, self.early_stopped
        )
    }
}

/// Multi-generation genetic trainer
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn elite_count(&self) -> usize {
        let count = (self.config.population_size as f64 * self.config.elite_fraction) as usize;
        count.clamp(1, self.config.population_size.max(1))
    }

    /// Train a sequence that walks from `start` toward `target`
    pub fn run(&self, start: Tile, target: Tile, grid: &Grid, rng: &mut impl Rng) -> TrainingReport {
        let size = self.config.population_size.max(2);
        let mut population: Vec<Candidate> = (0..size)
            .map(|_| Candidate::random(self.config.gene_length, rng))
            .collect();

        let mut history: Vec<f64> = Vec::with_capacity(self.config.generations as usize);
        let mut best = population[0].clone();
        best.fitness = f64::NEG_INFINITY;
        let mut stale = 0u32;
        let mut early_stopped = false;
        let mut generations = 0u32;

        for generation in 0..self.config.generations {
            population
                .par_iter_mut()
                .for_each(|c| c.fitness = pursuit_fitness(&c.genes, start, target, grid));
            population.sort_by(|a, b| {
                b.fitness
                    .partial_cmp(&a.fitness)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            generations = generation + 1;
            let generation_best = population[0].fitness;
            history.push(generation_best);
            if generation_best > best.fitness {
                best = population[0].clone();
            }

            if self.is_stalled(&history, &mut stale) {
                log::info!("Early stopping at generation {}", generation);
                early_stopped = true;
                break;
            }

            if (generation + 1) % 10 == 0 {
                log::info!("Generation {}, best fitness: {:.2}", generation + 1, generation_best);
            }

            population = self.breed(&population, size, rng);
        }

        TrainingReport {
            best,
            history,
            generations,
            early_stopped,
        }
    }

    /// The latest best is compared against every generation older than the
    /// history window; `stale` counts consecutive non-improvements.
    fn is_stalled(&self, history: &[f64], stale: &mut u32) -> bool {
        let window = self.config.history_window;
        if history.len() <= window {
            return false;
        }

        let latest = history[history.len() - 1];
        let older_best = history[..history.len() - window]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        if latest <= older_best {
            *stale += 1;
        } else {
            *stale = 0;
        }
        *stale >= self.config.patience
    }

    /// Next generation from a population sorted best first
    fn breed(&self, ranked: &[Candidate], size: usize, rng: &mut impl Rng) -> Vec<Candidate> {
        let mut next: Vec<Candidate> = ranked.iter().take(self.elite_count()).cloned().collect();

        while next.len() < size {
            let p1 = tournament_select(ranked, self.config.tournament_size, rng);
            let p2 = tournament_select(ranked, self.config.tournament_size, rng);

            let (mut c1, mut c2) = if rng.gen::<f64>() < self.config.crossover_rate {
                multi_point_crossover(p1, p2, rng)
            } else {
                (p1.clone(), p2.clone())
            };

            if rng.gen::<f64>() < self.config.mutation_rate {
                mutate(&mut c1, rng);
            }
            if rng.gen::<f64>() < self.config.mutation_rate {
                mutate(&mut c2, rng);
            }

            next.push(c1);
            next.push(c2);
        }

        next.truncate(size);
        next
    }
}

/// Best of `size` distinct candidates sampled uniformly
pub fn tournament_select<'a>(population: &'a [Candidate], size: usize, rng: &mut impl Rng) -> &'a Candidate {
    population
        .choose_multiple(rng, size.clamp(1, population.len()))
        .max_by(|a, b| {
            a.fitness
                .partial_cmp(&b.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(&population[0])
}

/// Swap parents at 1 to 3 random cut points, producing two children
pub fn multi_point_crossover(a: &Candidate, b: &Candidate, rng: &mut impl Rng) -> (Candidate, Candidate) {
    let len = a.genes.len();
    if len == 0 || len != b.genes.len() {
        return (a.clone(), b.clone());
    }

    let count = rng.gen_range(1..=3).min(len);
    let points = index::sample(rng, len, count).into_vec();

    let (mut first, mut second) = (&a.genes, &b.genes);
    let mut genes1 = Vec::with_capacity(len);
    let mut genes2 = Vec::with_capacity(len);
    for i in 0..len {
        if points.contains(&i) {
            std::mem::swap(&mut first, &mut second);
        }
        genes1.push(first[i]);
        genes2.push(second[i]);
    }

    (Candidate::from_genes(genes1), Candidate::from_genes(genes2))
}

/// Point (30%), swap (30%) or inversion (40%) mutation
pub fn mutate(candidate: &mut Candidate, rng: &mut impl Rng) {
    let genes = &mut candidate.genes;
    let len = genes.len();
    if len == 0 {
        return;
    }

    let roll = rng.gen::<f64>();
    if roll < 0.3 {
        let idx = rng.gen_range(0..len);
        genes[idx] = Direction::random(rng);
    } else if roll < 0.6 {
        if len < 2 {
            return;
        }
        let picked = index::sample(rng, len, 2);
        genes.swap(picked.index(0), picked.index(1));
    } else {
        let start = rng.gen_range(0..len);
        let upper = 5.min(len - start + 1).max(2);
        let length = rng.gen_range(1..upper);
        genes[start..start + length].reverse();
    }
}
