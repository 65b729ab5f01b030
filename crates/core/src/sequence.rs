use crate::difficulty::DifficultyProfile;
use crate::prng::Prng;

/// Probability that an eligible trial is forced into a true n-back match.
pub const MATCH_BIAS: f32 = 0.3;

/// Generate one stimulus sequence for a session.
///
/// Every value is a grid-cell index in `[0, grid_dim^2)`. Indices at or past
/// `n_back` copy the cell from `n_back` steps earlier with probability
/// [`MATCH_BIAS`]; everything else is drawn uniformly over the grid. The
/// resulting true-match rate is therefore *approximately* 30% of eligible
/// trials, not an exact per-run count: uniform draws can collide with the
/// n-back cell on their own.
pub fn generate(profile: &DifficultyProfile, rng: &mut Prng) -> Vec<u16> {
    let cells = profile.grid_cells();
    let len = profile.sequence_len as usize;
    let n = profile.n_back as usize;

    let mut seq: Vec<u16> = Vec::with_capacity(len);
    for i in 0..len {
        if i >= n && rng.chance(MATCH_BIAS) {
            let forced = seq[i - n];
            seq.push(forced);
        } else {
            seq.push(rng.gen_range_u16(0, cells));
        }
    }
    seq
}

/// Whether trial `index` is a true n-back match within `seq`.
pub fn is_match(seq: &[u16], index: usize, n_back: u32) -> bool {
    let n = n_back as usize;
    index >= n && seq[index] == seq[index - n]
}
