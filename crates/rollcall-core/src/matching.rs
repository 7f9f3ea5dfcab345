//! Identity gate: nearest reference embedding under a distance threshold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, record::PersonId};

/// Default acceptance threshold, in Euclidean distance over L2-normalised
/// embeddings. Matches must be strictly closer than this.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 1.0;

/// A face embedding produced by the external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
  pub fn new(values: Vec<f32>) -> Result<Self> {
    if values.is_empty() {
      return Err(Error::EmptyEmbedding);
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
      return Err(Error::NonFiniteEmbedding { index });
    }
    Ok(Self(values))
  }

  pub fn dimension(&self) -> usize { self.0.len() }

  pub fn as_slice(&self) -> &[f32] { &self.0 }

  /// Euclidean distance to `other`. Both sides must have the same dimension.
  pub fn distance(&self, other: &Embedding) -> Result<f32> {
    if self.dimension() != other.dimension() {
      return Err(Error::DimensionMismatch {
        expected: self.dimension(),
        found:    other.dimension(),
      });
    }
    Ok(euclidean_distance(&self.0, &other.0))
  }
}

impl TryFrom<Vec<f32>> for Embedding {
  type Error = Error;

  fn try_from(values: Vec<f32>) -> Result<Self> { Self::new(values) }
}

impl From<Embedding> for Vec<f32> {
  fn from(e: Embedding) -> Self { e.0 }
}

/// Euclidean distance over the common prefix of `a` and `b`.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
  a.iter()
    .zip(b)
    .map(|(x, y)| (x - y) * (x - y))
    .sum::<f32>()
    .sqrt()
}

// ─── Gallery ─────────────────────────────────────────────────────────────────

/// Reference embeddings for every known person, loaded once at startup.
///
/// Entries are kept in identifier order so ties between equally distant
/// references resolve the same way on every run.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
  references: BTreeMap<PersonId, Embedding>,
}

impl Gallery {
  pub fn new() -> Self { Self::default() }

  /// Add or replace the reference for `person_id`. All references must share
  /// one dimension.
  pub fn insert(&mut self, person_id: PersonId, embedding: Embedding) -> Result<()> {
    if let Some(expected) = self.dimension()
      && expected != embedding.dimension()
    {
      return Err(Error::DimensionMismatch { expected, found: embedding.dimension() });
    }
    self.references.insert(person_id, embedding);
    Ok(())
  }

  pub fn len(&self) -> usize { self.references.len() }

  pub fn is_empty(&self) -> bool { self.references.is_empty() }

  /// Dimension shared by every reference, or `None` while empty.
  pub fn dimension(&self) -> Option<usize> {
    self.references.values().next().map(Embedding::dimension)
  }

  pub fn person_ids(&self) -> impl Iterator<Item = &PersonId> { self.references.keys() }

  /// Find the reference nearest to `query` and accept it only if its
  /// distance is strictly below `threshold`.
  pub fn identify(&self, query: &Embedding, threshold: f32) -> Result<MatchOutcome> {
    if let Some(expected) = self.dimension()
      && expected != query.dimension()
    {
      return Err(Error::DimensionMismatch { expected, found: query.dimension() });
    }

    let mut nearest: Option<(&PersonId, f32)> = None;
    for (person_id, reference) in &self.references {
      let distance = euclidean_distance(query.as_slice(), reference.as_slice());
      // A NaN distance never compares below anything; it must not claim
      // the slot.
      if distance.is_nan() {
        continue;
      }
      if nearest.is_none_or(|(_, best)| distance < best) {
        nearest = Some((person_id, distance));
      }
    }

    Ok(match nearest {
      Some((person_id, distance)) if distance < threshold => MatchOutcome::Match {
        person_id: person_id.clone(),
        distance,
      },
      Some((_, distance)) => MatchOutcome::NoMatch { nearest_distance: Some(distance) },
      None => MatchOutcome::NoMatch { nearest_distance: None },
    })
  }
}

/// Result of [`Gallery::identify`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
  Match { person_id: PersonId, distance: f32 },
  /// Nothing close enough. `nearest_distance` is `None` for an empty gallery.
  NoMatch { nearest_distance: Option<f32> },
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn emb(values: &[f32]) -> Embedding { Embedding::new(values.to_vec()).unwrap() }

  fn pid(s: &str) -> PersonId { PersonId::new(s).unwrap() }

  #[test]
  fn distance_is_euclidean() {
    assert_eq!(emb(&[0.0, 0.0]).distance(&emb(&[3.0, 4.0])).unwrap(), 5.0);
    assert_eq!(emb(&[1.0, 2.0]).distance(&emb(&[1.0, 2.0])).unwrap(), 0.0);
  }

  #[test]
  fn empty_embedding_rejected() {
    assert_eq!(Embedding::new(vec![]), Err(Error::EmptyEmbedding));
    assert!(serde_json::from_str::<Embedding>("[]").is_err());
  }

  #[test]
  fn picks_nearest_under_threshold() {
    let mut gallery = Gallery::new();
    gallery.insert(pid("A"), emb(&[0.3, 0.0])).unwrap();
    gallery.insert(pid("B"), emb(&[1.2, 0.0])).unwrap();

    let outcome = gallery.identify(&emb(&[0.0, 0.0]), DEFAULT_MATCH_THRESHOLD).unwrap();
    match outcome {
      MatchOutcome::Match { person_id, distance } => {
        assert_eq!(person_id, pid("A"));
        assert!((distance - 0.3).abs() < 1e-6);
      }
      other => panic!("expected a match, got {other:?}"),
    }
  }

  #[test]
  fn all_references_too_far_is_no_match() {
    let mut gallery = Gallery::new();
    gallery.insert(pid("A"), emb(&[1.0, 0.0])).unwrap();
    gallery.insert(pid("B"), emb(&[0.0, 1.5])).unwrap();

    let outcome = gallery.identify(&emb(&[0.0, 0.0]), DEFAULT_MATCH_THRESHOLD).unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch { nearest_distance: Some(1.0) });
  }

  #[test]
  fn empty_gallery_is_no_match() {
    let outcome = Gallery::new()
      .identify(&emb(&[0.1, 0.2]), DEFAULT_MATCH_THRESHOLD)
      .unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch { nearest_distance: None });
  }

  #[test]
  fn ties_resolve_to_first_identifier() {
    let mut gallery = Gallery::new();
    gallery.insert(pid("Zed"), emb(&[0.5, 0.0])).unwrap();
    gallery.insert(pid("Amy"), emb(&[-0.5, 0.0])).unwrap();

    let outcome = gallery.identify(&emb(&[0.0, 0.0]), DEFAULT_MATCH_THRESHOLD).unwrap();
    assert!(matches!(outcome, MatchOutcome::Match { person_id, .. } if person_id == pid("Amy")));
  }

  #[test]
  fn dimension_mismatch_is_an_error() {
    let mut gallery = Gallery::new();
    gallery.insert(pid("A"), emb(&[0.0, 0.0])).unwrap();

    assert_eq!(
      gallery.insert(pid("B"), emb(&[0.0, 0.0, 0.0])),
      Err(Error::DimensionMismatch { expected: 2, found: 3 })
    );
    assert_eq!(
      gallery.identify(&emb(&[0.0]), DEFAULT_MATCH_THRESHOLD),
      Err(Error::DimensionMismatch { expected: 2, found: 1 })
    );
  }

  #[test]
  fn non_finite_components_are_rejected() {
    assert_eq!(
      Embedding::new(vec![0.0, f32::NAN]),
      Err(Error::NonFiniteEmbedding { index: 1 })
    );
    assert_eq!(
      Embedding::new(vec![f32::NEG_INFINITY]),
      Err(Error::NonFiniteEmbedding { index: 0 })
    );
    // 1e39 overflows f32 and parses as infinity.
    assert!(serde_json::from_str::<Embedding>("[1e39, 0.0]").is_err());
    assert!(serde_json::from_str::<Embedding>("[0.5, 0.0]").is_ok());
  }

  #[test]
  fn overflowing_distance_does_not_hide_a_close_reference() {
    let mut gallery = Gallery::new();
    gallery.insert(pid("Aaron"), emb(&[f32::MAX, 0.0])).unwrap();
    gallery.insert(pid("Boris"), emb(&[0.1, 0.0])).unwrap();

    let outcome = gallery.identify(&emb(&[0.0, 0.0]), DEFAULT_MATCH_THRESHOLD).unwrap();
    match outcome {
      MatchOutcome::Match { person_id, distance } => {
        assert_eq!(person_id, pid("Boris"));
        assert!((distance - 0.1).abs() < 1e-6);
      }
      other => panic!("expected Boris, got {other:?}"),
    }
  }

  proptest! {
    #[test]
    fn match_is_always_strictly_under_threshold(
      refs in proptest::collection::vec(proptest::collection::vec(-1.0f32..1.0, 4), 1..8),
      query in proptest::collection::vec(-1.0f32..1.0, 4),
      threshold in 0.1f32..2.0,
    ) {
      let mut gallery = Gallery::new();
      for (i, r) in refs.iter().enumerate() {
        gallery.insert(pid(&format!("p{i}")), emb(r)).unwrap();
      }
      let query = emb(&query);
      let min = refs
        .iter()
        .map(|r| euclidean_distance(query.as_slice(), r))
        .fold(f32::INFINITY, f32::min);

      match gallery.identify(&query, threshold).unwrap() {
        MatchOutcome::Match { distance, .. } => {
          prop_assert!(distance < threshold);
          prop_assert_eq!(distance, min);
        }
        MatchOutcome::NoMatch { nearest_distance } => {
          prop_assert!(min >= threshold);
          prop_assert_eq!(nearest_distance, Some(min));
        }
      }
    }
  }
}
