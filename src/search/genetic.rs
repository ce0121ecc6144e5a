//! Evolutionary search over fixed-length move sequences.
//!
//! A population of candidate walks is scored by simulating each walk from
//! the agent's tile, then bred with roulette selection, single-point
//! crossover and per-gene mutation. The best candidate always survives into
//! the next generation, so the recorded best fitness never decreases while
//! the fitness function stays fixed.

use crate::grid::{Direction, Grid, Tile};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ordered move directions
pub type GeneSequence = Vec<Direction>;

pub const DEFAULT_POPULATION_SIZE: usize = 20;
pub const DEFAULT_GENE_LENGTH: usize = 10;
pub const DEFAULT_MUTATION_RATE: f64 = 0.1;

/// A gene sequence and its last evaluated fitness
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub genes: GeneSequence,
    pub fitness: f64,
}

impl Candidate {
    pub fn from_genes(genes: GeneSequence) -> Self {
        Self { genes, fitness: 0.0 }
    }

    /// Uniformly random sequence
    pub fn random(length: usize, rng: &mut impl Rng) -> Self {
        Self::from_genes((0..length).map(|_| Direction::random(rng)).collect())
    }

    /// Single-point crossover: genes before a random midpoint come from
    /// `self`, the rest from `partner`
    pub fn crossover(&self, partner: &Candidate, rng: &mut impl Rng) -> Candidate {
        let len = self.genes.len().min(partner.genes.len());
        if len == 0 {
            return Candidate::from_genes(self.genes.clone());
        }

        let midpoint = rng.gen_range(0..len);
        let mut genes = Vec::with_capacity(len);
        genes.extend_from_slice(&self.genes[..midpoint]);
        genes.extend_from_slice(&partner.genes[midpoint..len]);
        Candidate::from_genes(genes)
    }

    /// Replace each gene by a random direction with probability `rate`
    pub fn mutate(&mut self, rate: f64, rng: &mut impl Rng) {
        for gene in &mut self.genes {
            if rng.gen::<f64>() < rate {
                *gene = Direction::random(rng);
            }
        }
    }

    pub fn first_move(&self) -> Option<Direction> {
        self.genes.first().copied()
    }
}

/// Population-based move-sequence search for one agent
#[derive(Clone, Debug)]
pub struct GeneticSearch {
    population: Vec<Candidate>,
    best: Option<Candidate>,
    generation: u32,
}

impl GeneticSearch {
    /// Random population of `population_size` sequences of `gene_length`
    pub fn new(population_size: usize, gene_length: usize, rng: &mut impl Rng) -> Self {
        Self::with_seed(population_size, gene_length, None, rng)
    }

    /// Random population whose first member is a pre-trained sequence
    pub fn with_seed(
        population_size: usize,
        gene_length: usize,
        seed: Option<&[Direction]>,
        rng: &mut impl Rng,
    ) -> Self {
        let mut population = Vec::with_capacity(population_size);

        if let Some(genes) = seed.filter(|g| !g.is_empty()) {
            let mut seeded = genes.to_vec();
            seeded.resize_with(gene_length, || Direction::random(rng));
            population.push(Candidate::from_genes(seeded));
        }

        while population.len() < population_size {
            population.push(Candidate::random(gene_length, rng));
        }

        let best = population.first().cloned();
        Self {
            population,
            best,
            generation: 0,
        }
    }

    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Score every candidate, sort descending and retain the top one
    pub fn evaluate<F>(&mut self, mut fitness: F)
    where
        F: FnMut(&[Direction]) -> f64,
    {
        for candidate in &mut self.population {
            candidate.fitness = fitness(&candidate.genes);
        }

        self.population.sort_by(|a, b| {
            b.fitness
                .partial_cmp(&a.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.best = self.population.first().cloned();
    }

    /// Breed the next generation.
    ///
    /// The previous best is carried over unchanged; the remaining slots are
    /// filled with mutated crossover children of roulette-selected parents.
    pub fn evolve(&mut self, mutation_rate: f64, rng: &mut impl Rng) {
        if self.population.is_empty() {
            return;
        }

        let target_size = self.population.len();
        let mut next = Vec::with_capacity(target_size);
        if let Some(best) = &self.best {
            next.push(best.clone());
        }

        while next.len() < target_size {
            let a = self.select(rng);
            let b = self.select(rng);
            let mut child = a.crossover(b, rng);
            child.mutate(mutation_rate, rng);
            next.push(child);
        }

        self.population = next;
        self.generation += 1;
    }

    /// Fitness-proportionate selection.
    ///
    /// Negative fitness counts as zero weight; when no candidate has positive
    /// weight the pick is uniform.
    fn select(&self, rng: &mut impl Rng) -> &Candidate {
        let total: f64 = self.population.iter().map(|c| c.fitness.max(0.0)).sum();

        if total <= 0.0 || !total.is_finite() {
            let index = rng.gen_range(0..self.population.len());
            return &self.population[index];
        }

        let pick = rng.gen_range(0.0..total);
        let mut running = 0.0;
        for candidate in &self.population {
            running += candidate.fitness.max(0.0);
            if running > pick {
                return candidate;
            }
        }

        // Rounding can leave `pick` just above the running sum
        &self.population[self.population.len() - 1]
    }

    /// First move of the best candidate
    pub fn propose_move(&self) -> Option<Direction> {
        self.best.as_ref().and_then(Candidate::first_move)
    }
}

/// Simulate a gene walk from `start`. A move into a wall or off the grid is
/// skipped but still spends its gene. Returns the position after each gene.
pub fn walk(genes: &[Direction], start: Tile, grid: &Grid) -> Vec<Tile> {
    let mut position = start;
    genes
        .iter()
        .map(|gene| {
            let next = position.step(*gene);
            if grid.is_walkable_tile(next) {
                position = next;
            }
            position
        })
        .collect()
}

/// Fitness of a gene walk chasing `target`.
///
/// Per step: `1 / (d + 1)` for the Manhattan distance `d` to the target, a
/// count of the target's walkable neighbours strictly closer to the walker
/// than `d`, and a 0.5 penalty for standing on the prior simulated position.
/// The escape-route count is added with weight 2 at the end.
pub fn pursuit_fitness(genes: &[Direction], start: Tile, target: Tile, grid: &Grid) -> f64 {
    let mut score = 0.0;
    let mut routes_cut = 0u32;
    let mut last = start;

    for position in walk(genes, start, grid) {
        let distance = position.manhattan(target);
        score += 1.0 / (distance as f64 + 1.0);

        for route in target.neighbors() {
            if grid.is_walkable_tile(route) && position.manhattan(route) < distance {
                routes_cut += 1;
            }
        }

        if position == last {
            score -= 0.5;
        }
        last = position;
    }

    score + routes_cut as f64 * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_new_population_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let search = GeneticSearch::new(20, 10, &mut rng);
        assert_eq!(search.population().len(), 20);
        assert!(search.population().iter().all(|c| c.genes.len() == 10));
        assert_eq!(search.generation(), 0);
    }

    #[test]
    fn test_seeded_population_keeps_seed_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let seed = vec![Direction::Left, Direction::Left, Direction::Up];
        let search = GeneticSearch::with_seed(5, 6, Some(&seed), &mut rng);
        assert_eq!(&search.population()[0].genes[..3], &seed[..]);
        assert_eq!(search.population()[0].genes.len(), 6);
        assert_eq!(search.population().len(), 5);
    }

    #[test]
    fn test_walk_skips_walls() {
        let grid = Grid::from_rows(&["#####", "#...#", "#####"]);
        let genes = [Direction::Up, Direction::Right, Direction::Right, Direction::Right];
        let positions = walk(&genes, Tile::new(1, 1), &grid);
        assert_eq!(
            positions,
            vec![Tile::new(1, 1), Tile::new(2, 1), Tile::new(3, 1), Tile::new(3, 1)]
        );
    }

    #[test]
    fn test_fitness_rewards_approach() {
        let grid = Grid::open(11, 11);
        let start = Tile::new(5, 5);
        let target = Tile::new(9, 5);
        let toward = vec![Direction::Right; 4];
        let away = vec![Direction::Left; 4];
        assert!(
            pursuit_fitness(&toward, start, target, &grid) > pursuit_fitness(&away, start, target, &grid)
        );
    }

    #[test]
    fn test_fitness_penalizes_standing_still() {
        let grid = Grid::from_rows(&["#####", "#...#", "#####"]);
        let start = Tile::new(1, 1);
        let target = Tile::new(3, 1);
        // Up is blocked, so the walker stays put and pays the penalty
        let stuck = pursuit_fitness(&[Direction::Up], start, target, &grid);
        let expected = 1.0 / 3.0 - 0.5 + 2.0;
        assert!((stuck - expected).abs() < 1e-9);
    }

    #[test]
    fn test_crossover_takes_prefix_and_suffix() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let a = Candidate::from_genes(vec![Direction::Up; 8]);
        let b = Candidate::from_genes(vec![Direction::Down; 8]);
        for _ in 0..20 {
            let child = a.crossover(&b, &mut rng);
            assert_eq!(child.genes.len(), 8);
            let split = child.genes.iter().take_while(|g| **g == Direction::Up).count();
            assert!(child.genes[split..].iter().all(|g| *g == Direction::Down));
        }
    }

    #[test]
    fn test_mutation_rate_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut unchanged = Candidate::from_genes(vec![Direction::Up; 16]);
        unchanged.mutate(0.0, &mut rng);
        assert!(unchanged.genes.iter().all(|g| *g == Direction::Up));
    }

    #[test]
    fn test_evolve_keeps_size_and_counts_generations() {
        let grid = Grid::open(11, 11);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut search = GeneticSearch::new(12, 8, &mut rng);
        for _ in 0..3 {
            search.evaluate(|g| pursuit_fitness(g, Tile::new(1, 1), Tile::new(9, 9), &grid));
            search.evolve(0.1, &mut rng);
        }
        assert_eq!(search.population().len(), 12);
        assert_eq!(search.generation(), 3);
    }

    #[test]
    fn test_best_fitness_monotonic() {
        let grid = Grid::open(15, 15);
        let start = Tile::new(2, 2);
        let target = Tile::new(12, 11);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut search = GeneticSearch::new(20, 10, &mut rng);

        search.evaluate(|g| pursuit_fitness(g, start, target, &grid));
        let mut previous = search.best().unwrap().fitness;
        for _ in 0..30 {
            search.evolve(0.1, &mut rng);
            search.evaluate(|g| pursuit_fitness(g, start, target, &grid));
            let current = search.best().unwrap().fitness;
            assert!(current >= previous, "best fitness dropped: {} -> {}", previous, current);
            previous = current;
        }
    }

    #[test]
    fn test_select_with_negative_fitness() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut search = GeneticSearch::new(4, 3, &mut rng);
        search.evaluate(|_| -1.0);
        search.evolve(0.5, &mut rng);
        assert_eq!(search.population().len(), 4);
    }
}
