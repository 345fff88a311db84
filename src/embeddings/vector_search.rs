// Exact nearest-neighbour search over squared Euclidean distance

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Position of the vector in insertion order
    pub index: usize,
    pub distance: f32,
}

/// Brute-force L2 index. Vectors are stored contiguously and every search
/// scans all of them, so results are exact.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors; either all are added or none are
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        if self.dimension == 0 {
            return Err(AppError::Index("Index dimension must be positive".to_string()));
        }
        if let Some((position, bad)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != self.dimension)
        {
            return Err(AppError::Index(format!(
                "Vector {} has dimension {}, expected {}",
                position,
                bad.len(),
                self.dimension
            )));
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// The `min(k, len)` nearest vectors, closest first
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchResult>> {
        if query.len() != self.dimension {
            return Err(AppError::Index(format!(
                "Query has dimension {}, expected {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<SearchResult> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(index, vector)| SearchResult {
                index,
                distance: euclidean_distance_squared(query, vector),
            })
            .collect();

        // NaN sorts last; ties go to the earlier vector
        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[Vec<f32>]) -> FlatL2Index {
        let mut index = FlatL2Index::new(vectors[0].len());
        index.add(vectors).unwrap();
        index
    }

    #[test]
    fn test_distance() {
        assert_eq!(euclidean_distance_squared(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(euclidean_distance_squared(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = index_with(&[vec![10.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0]]);
        let results = index.search(&[0.0, 0.0], 3).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(results[0].distance, 1.0);
        assert_eq!(results[2].distance, 100.0);
    }

    #[test]
    fn test_search_returns_min_k_len() {
        let index = index_with(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        for k in 0..=4 {
            assert_eq!(index.search(&[0.5], k).unwrap().len(), k);
        }
        assert_eq!(index.search(&[0.5], 10).unwrap().len(), 4);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let index = index_with(&[vec![1.0], vec![-1.0], vec![1.0]]);
        let order: Vec<usize> = index
            .search(&[0.0], 3)
            .unwrap()
            .iter()
            .map(|r| r.index)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_index() {
        let index = FlatL2Index::new(4);
        assert!(index.is_empty());
        assert!(index.search(&[0.0; 4], 3).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatL2Index::new(2);
        assert!(matches!(
            index.add(&[vec![1.0, 2.0], vec![1.0]]),
            Err(AppError::Index(_))
        ));
        // Rejected batches leave the index untouched
        assert_eq!(index.len(), 0);

        index.add(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(index.search(&[1.0], 1), Err(AppError::Index(_))));
    }
}
