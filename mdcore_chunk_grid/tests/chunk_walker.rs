#![allow(missing_docs)]

use std::num::NonZeroU64;

use mdcore_chunk_grid::{ArrayRegion, ArraySubset, ChunkWalker, check_region, chunk_size_for_budget};

#[test]
fn chunk_walker_budget_regions_are_valid() {
    let array_shape = [37u64, 5, 300];
    let chunk_shape = chunk_size_for_budget(&array_shape, &[0, 0, 64], 4, 4096, 16).unwrap();
    let max_elements: u64 = chunk_shape.iter().map(|c| c.get()).product();
    assert!(max_elements * 4 <= 4096);

    let request = ArraySubset::new_with_ranges(&[3..30, 0..5, 17..299]);
    let mut walker = ChunkWalker::new(&request, &chunk_shape).unwrap();
    let total = walker.total_chunks();
    let mut elements = 0u64;
    let mut visits = 0u64;
    let completed = walker
        .walk(|visit| -> Result<bool, mdcore_chunk_grid::RegionError> {
            assert_eq!(visit.index, visits);
            assert_eq!(visit.total, total);
            assert!(visit.subset.num_elements() <= max_elements);
            let region = ArrayRegion::try_from(&visit.subset)?;
            let num_elements = region.num_elements().unwrap();
            let checked = check_region(&array_shape, &region, 4, num_elements * 4)?;
            assert_eq!(checked.num_elements(), num_elements);
            elements += visit.subset.num_elements();
            visits += 1;
            Ok(true)
        })
        .unwrap();
    assert!(completed);
    assert_eq!(visits, total);
    assert_eq!(elements, request.num_elements());
}

#[test]
fn chunk_walker_partial_boundary_chunks() {
    let chunk_shape = [NonZeroU64::new(4).unwrap(), NonZeroU64::new(3).unwrap()];
    let walker =
        ChunkWalker::new(&ArraySubset::new_with_ranges(&[2..9, 1..4]), &chunk_shape).unwrap();
    // rows 2..4, 4..8, 8..9 and columns 1..3, 3..4
    assert_eq!(walker.num_chunks(), &[3, 2]);
    let shapes: Vec<Vec<u64>> = walker.map(|visit| visit.subset.shape().to_vec()).collect();
    assert_eq!(
        shapes,
        vec![
            vec![2, 2],
            vec![2, 1],
            vec![4, 2],
            vec![4, 1],
            vec![1, 2],
            vec![1, 1]
        ]
    );
}
