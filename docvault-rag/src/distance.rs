//! Distance functions for vector similarity.
//!
//! [`DistanceFn`] is the one place where the crate's metric vocabulary meets
//! the token a storage engine persists. Engines store the token string a
//! collection was created with and parse it back through [`DistanceFn::from_token`],
//! so swapping storage engines never touches metric naming anywhere else.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RagError, Result};

/// The distance function a collection ranks neighbors with.
///
/// [`DistanceFn::distance`] always returns lower-is-better values, whatever
/// the underlying metric's natural direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceFn {
    /// One minus cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
    /// Negated dot product.
    Dot,
}

impl DistanceFn {
    /// The token stored alongside a collection.
    pub fn as_token(&self) -> &'static str {
        match self {
            DistanceFn::Cosine => "cosine",
            DistanceFn::L2 => "l2",
            DistanceFn::Dot => "dot",
        }
    }

    /// Parse a stored token back into a distance function.
    ///
    /// # Errors
    /// Returns [`RagError::ConfigError`] for tokens this crate never wrote.
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "cosine" => Ok(DistanceFn::Cosine),
            "l2" => Ok(DistanceFn::L2),
            "dot" => Ok(DistanceFn::Dot),
            other => Err(RagError::ConfigError(format!(
                "unknown distance token '{other}'"
            ))),
        }
    }

    /// Distance between two vectors; lower means closer.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceFn::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceFn::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DistanceFn::Dot => -dot(a, b),
        }
    }
}

impl Serialize for DistanceFn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_token())
    }
}

impl<'de> Deserialize<'de> for DistanceFn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        DistanceFn::from_token(&token).map_err(D::Error::custom)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for f in [DistanceFn::Cosine, DistanceFn::L2, DistanceFn::Dot] {
            assert_eq!(DistanceFn::from_token(f.as_token()).unwrap(), f);
        }
        assert!(DistanceFn::from_token("euclid").is_err());
    }

    #[test]
    fn serde_uses_tokens() {
        let json = serde_json::to_string(&DistanceFn::L2).unwrap();
        assert_eq!(json, "\"l2\"");
        let back: DistanceFn = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(back, DistanceFn::Cosine);
        assert!(serde_json::from_str::<DistanceFn>("\"manhattan\"").is_err());
    }

    #[test]
    fn cosine_distance_is_zero_for_parallel_vectors() {
        let d = DistanceFn::Cosine.distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_zero_magnitude() {
        let d = DistanceFn::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(d, 1.0);
    }

    #[test]
    fn l2_matches_euclidean_geometry() {
        let d = DistanceFn::L2.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn every_metric_ranks_the_closer_vector_lower() {
        let query = [1.0, 0.0];
        let near = [0.9, 0.1];
        let far = [0.1, 0.9];
        for f in [DistanceFn::Cosine, DistanceFn::L2, DistanceFn::Dot] {
            assert!(
                f.distance(&near, &query) < f.distance(&far, &query),
                "{} did not rank the nearer vector first",
                f.as_token()
            );
        }
    }
}
