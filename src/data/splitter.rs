// ============================================================
// Layer 4 - Train/Test Splitter
// ============================================================
// Randomly assigns samples to two partitions:
//   - Training set: used to update model weights
//   - Test set:     used for validation loss and BLEU
//
// The test side receives ceil(n * test_proportion) samples,
// the training side keeps the rest. The split happens before
// length sorting, so which samples land where does not depend
// on their length.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` with `rng` and split into (train, test).
///
/// # Arguments
/// * `samples`         - All available samples (consumed by this function)
/// * `test_proportion` - Fraction sent to the test side, e.g. 0.1 = 10%
/// * `rng`             - Source of randomness; seed it for reproducible runs
///
/// # Example
/// ```ignore
/// let mut rng = StdRng::seed_from_u64(42);
/// let (train, test) = split_train_test(all_samples, 0.1, &mut rng);
/// ```
pub fn split_train_test<T, R: Rng + ?Sized>(
    mut samples:     Vec<T>,
    test_proportion: f64,
    rng:             &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total    = samples.len();
    let n_test   = ((total as f64) * test_proportion).ceil() as usize;
    let split_at = total - n_test.min(total);

    // split_off(n) removes elements [n..] and returns them
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} train, {} test ({}% / {}%)",
        samples.len(),
        test.len(),
        (samples.len() * 100) / total.max(1),
        (test.len()    * 100) / total.max(1),
    );

    (samples, test)
}
