//! Border-seeded flood fill
//!
//! Every background-colored border pixel seeds an iterative depth-first fill
//! over 4-connected background-colored pixels. Reached pixels are voted
//! transparent regardless of their local density. A single `visited` array is
//! shared by all seeds, so total work is O(width * height).
//!
//! Diagonal-only contact does not connect two regions. A background pocket
//! that touches the open background only through a one-pixel diagonal gap is
//! left to the density vote.

use super::classifier::BackgroundMap;

/// Border pixel indices: top row, bottom row, left column, right column
///
/// Corners appear more than once; the fill skips visited pixels.
fn border_indices(width: usize, height: usize) -> impl Iterator<Item = usize> {
    let last_row = (height - 1) * width;
    let top = 0..width;
    let bottom = (0..width).map(move |x| last_row + x);
    let left = (0..height).map(move |y| y * width);
    let right = (0..height).map(move |y| y * width + width - 1);
    top.chain(bottom).chain(left).chain(right)
}

/// Connectivity votes for every pixel, in row-major order
#[must_use]
pub fn flood_votes(map: &BackgroundMap) -> Vec<bool> {
    let width = map.width() as usize;
    let height = map.height() as usize;
    let mut transparent = vec![false; map.len()];
    if transparent.is_empty() {
        return transparent;
    }

    let mut visited = vec![false; map.len()];
    let mut stack: Vec<usize> = Vec::new();

    for seed in border_indices(width, height) {
        if visited[seed] || !map.is_background(seed) {
            continue;
        }

        stack.push(seed);
        while let Some(index) = stack.pop() {
            if visited[index] {
                continue;
            }
            visited[index] = true;

            if !map.is_background(index) {
                // Region boundary
                continue;
            }
            transparent[index] = true;

            let x = index % width;
            let y = index / width;
            if y > 0 {
                stack.push(index - width);
            }
            if y + 1 < height {
                stack.push(index + width);
            }
            if x > 0 {
                stack.push(index - 1);
            }
            if x + 1 < width {
                stack.push(index + 1);
            }
        }
    }

    tracing::trace!(
        reached = transparent.iter().filter(|&&t| t).count(),
        "Flood fill complete"
    );
    transparent
}
