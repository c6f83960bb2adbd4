// Cosine distance between contextual embeddings.
//
// Distance is 1 - cosine similarity, so the range is [0, 2]: 0 for
// identical directions, 1 for orthogonal vectors, 2 for opposite ones.
// A zero-magnitude vector has no direction, so the distance is undefined;
// these functions refuse it instead of emitting NaN. The analyzer excludes
// all-zero embeddings before calling in here.

use anyhow::Result;

/// Cosine distance between two equal-length vectors.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        anyhow::bail!(
            "embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        );
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        anyhow::bail!("cosine distance is undefined for a zero-magnitude vector");
    }

    Ok(1.0 - dot / denom)
}

/// Centroid (elementwise mean) of a non-empty set of vectors.
fn centroid(xs: &[Vec<f64>]) -> Result<Vec<f64>> {
    let first = xs
        .first()
        .ok_or_else(|| anyhow::anyhow!("cannot average an empty embedding set"))?;

    let n = xs.len() as f64;
    let mut mean = vec![0.0_f64; first.len()];
    for x in xs {
        for (m, v) in mean.iter_mut().zip(x.iter()) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    Ok(mean)
}

/// The "averaging" drift signal: cosine distance between the centroids of
/// the two time slices. Cheap single-vector-pair comparison, insensitive to
/// within-slice variance.
pub fn averaged_embedding_distance(xs: &[Vec<f64>], ys: &[Vec<f64>]) -> Result<f64> {
    cosine_distance(&centroid(xs)?, &centroid(ys)?)
}

/// Mean cosine distance over every cross-slice pair. O(|X|*|Y|), diagnostic
/// logging only — the run loop computes it only when debug logging is on.
pub fn mean_pairwise_cosine_distance(xs: &[Vec<f64>], ys: &[Vec<f64>]) -> Result<f64> {
    if xs.is_empty() || ys.is_empty() {
        anyhow::bail!("cannot compute pairwise distances over an empty embedding set");
    }

    let mut total = 0.0;
    for x in xs {
        for y in ys {
            total += cosine_distance(x, y)?;
        }
    }
    Ok(total / (xs.len() * ys.len()) as f64)
}
