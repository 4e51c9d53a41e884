//! Conversion between linear cell indices and per-dimension positions.
//!
//! Cubes are laid out in row-major (C) order: the last dimension varies fastest.

/// Decode a linear cell index into one position per dimension.
///
/// Positions are returned in the same order as `sizes`. The index must lie in
/// `[0, product(sizes))`; this is not checked and out of range indices decode to positions that
/// do not address the intended cell.
///
/// # Arguments
///
/// * `index`: Linear cell index
/// * `sizes`: Size of each dimension
pub fn linear_index_to_coords(index: usize, sizes: &[usize]) -> Vec<usize> {
    let mut index = index;
    let mut coords: Vec<usize> = sizes
        .iter()
        .rev()
        .map(|size| {
            let position = index % size;
            index /= size;
            position
        })
        .collect();
    coords.reverse();
    coords
}

/// Encode per-dimension positions into a linear cell index.
///
/// This is the inverse of [linear_index_to_coords] for in-range positions.
///
/// # Arguments
///
/// * `coords`: Position along each dimension
/// * `sizes`: Size of each dimension
pub fn coords_to_linear_index(coords: &[usize], sizes: &[usize]) -> usize {
    std::iter::zip(coords, row_major_strides(sizes))
        .map(|(position, stride)| position * stride)
        .sum()
}

/// Returns the row-major strides of an array with the given dimension sizes.
fn row_major_strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; sizes.len()];
    for axis in (0..sizes.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * sizes[axis + 1];
    }
    strides
}
