//! Neighbor-density vote
//!
//! A background-colored pixel is voted transparent when it sits on the
//! image border, or when more than `threshold` of its in-bounds 8-neighbors
//! are background-colored. No connectivity is considered, so small enclosed
//! background blobs and thin seams can be voted transparent here.

use super::classifier::BackgroundMap;

/// Offsets of the 8-neighborhood
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Vote for a single pixel
#[must_use]
pub fn vote_pixel(map: &BackgroundMap, x: u32, y: u32, threshold: f32) -> bool {
    if !map.is_background_at(x, y) {
        return false;
    }
    if map.is_border(x, y) {
        return true;
    }

    let (width, height) = (i64::from(map.width()), i64::from(map.height()));
    let mut total = 0u32;
    let mut background = 0u32;

    for (dx, dy) in NEIGHBOR_OFFSETS {
        let nx = i64::from(x) + dx;
        let ny = i64::from(y) + dy;
        if nx < 0 || ny < 0 || nx >= width || ny >= height {
            continue;
        }
        total += 1;
        if map.is_background_at(nx as u32, ny as u32) {
            background += 1;
        }
    }

    total > 0 && background as f32 / total as f32 > threshold
}

/// Fill one row of votes
fn vote_row(map: &BackgroundMap, y: u32, threshold: f32, row: &mut [bool]) {
    for (x, vote) in (0u32..).zip(row.iter_mut()) {
        *vote = vote_pixel(map, x, y, threshold);
    }
}

/// Density votes for every pixel, in row-major order
#[must_use]
pub fn density_votes(map: &BackgroundMap, threshold: f32) -> Vec<bool> {
    let mut votes = vec![false; map.len()];
    if votes.is_empty() {
        return votes;
    }

    for (y, row) in (0u32..).zip(votes.chunks_mut(map.width() as usize)) {
        vote_row(map, y, threshold, row);
    }
    votes
}

/// Row-sharded variant of [`density_votes`]; produces identical output
#[cfg(feature = "parallel")]
#[must_use]
pub fn density_votes_parallel(map: &BackgroundMap, threshold: f32) -> Vec<bool> {
    use rayon::prelude::*;

    let mut votes = vec![false; map.len()];
    if votes.is_empty() {
        return votes;
    }

    votes
        .par_chunks_mut(map.width() as usize)
        .enumerate()
        .for_each(|(y, row)| vote_row(map, y as u32, threshold, row));
    votes
}
