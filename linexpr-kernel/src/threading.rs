//! Disjoint work partitioning on top of `rayon::join`.
//!
//! Work is split recursively in halves until either the thread budget for a
//! subtree reaches one or the remaining piece drops below the grain size.
//! Every leaf receives an exclusive piece of the target together with its
//! offset in the full index range, so leaves never write to the same element.
//!
//! Without the `parallel` feature both entry points run the leaf once on the
//! whole range.

use crate::layout::{MatMut, VecMut};
use crate::maybe_sync::MaybeSync;

/// Minimum number of scalar operations that justifies splitting.
pub const MIN_PARALLEL_WORK: usize = 1 << 15;

/// Number of worker threads available to a split.
pub fn available_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Run `f(row_offset, rows)` over disjoint row blocks of `target`.
///
/// `work_per_row` is the estimated scalar work per row; splitting stops once a
/// block carries less than `threshold` work.
pub fn par_rows<T, F>(target: MatMut<'_, T>, work_per_row: usize, threshold: usize, f: &F)
where
    T: Send,
    F: Fn(usize, MatMut<'_, T>) + MaybeSync,
{
    split_rows(target, 0, available_threads(), work_per_row.max(1), threshold, f);
}

#[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
fn split_rows<T, F>(
    target: MatMut<'_, T>,
    offset: usize,
    nthreads: usize,
    work_per_row: usize,
    threshold: usize,
    f: &F,
) where
    T: Send,
    F: Fn(usize, MatMut<'_, T>) + MaybeSync,
{
    #[cfg(feature = "parallel")]
    {
        let rows = target.rows();
        if nthreads > 1 && rows >= 2 && rows * work_per_row > threshold {
            let mid = rows / 2;
            let left_threads = nthreads / 2;
            let (top, bottom) = target.split_at_row(mid);
            rayon::join(
                || split_rows(top, offset, left_threads, work_per_row, threshold, f),
                || {
                    split_rows(
                        bottom,
                        offset + mid,
                        nthreads - left_threads,
                        work_per_row,
                        threshold,
                        f,
                    )
                },
            );
            return;
        }
    }
    f(offset, target);
}

/// Run `f(offset, chunk)` over disjoint chunks of `target`.
pub fn par_chunks<T, F>(target: VecMut<'_, T>, work_per_elem: usize, threshold: usize, f: &F)
where
    T: Send,
    F: Fn(usize, VecMut<'_, T>) + MaybeSync,
{
    split_chunks(target, 0, available_threads(), work_per_elem.max(1), threshold, f);
}

#[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
fn split_chunks<T, F>(
    target: VecMut<'_, T>,
    offset: usize,
    nthreads: usize,
    work_per_elem: usize,
    threshold: usize,
    f: &F,
) where
    T: Send,
    F: Fn(usize, VecMut<'_, T>) + MaybeSync,
{
    #[cfg(feature = "parallel")]
    {
        let len = target.len();
        if nthreads > 1 && len >= 2 && len * work_per_elem > threshold {
            let mid = len / 2;
            let left_threads = nthreads / 2;
            let (left, right) = target.split_at(mid);
            rayon::join(
                || split_chunks(left, offset, left_threads, work_per_elem, threshold, f),
                || {
                    split_chunks(
                        right,
                        offset + mid,
                        nthreads - left_threads,
                        work_per_elem,
                        threshold,
                        f,
                    )
                },
            );
            return;
        }
    }
    f(offset, target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_par_rows_covers_every_row_once() {
        let rows = 300;
        let cols = 200;
        let mut data = vec![0usize; rows * cols];
        let visited = AtomicUsize::new(0);
        let target = MatMut::from_slice(&mut data, rows, cols, true);
        par_rows(target, cols, 1000, &|offset, mut block: MatMut<'_, usize>| {
            visited.fetch_add(block.rows(), Ordering::Relaxed);
            for i in 0..block.rows() {
                for j in 0..block.cols() {
                    block.set(i, j, block.get(i, j) + offset + i);
                }
            }
        });
        assert_eq!(visited.load(Ordering::SeqCst), rows);
        for i in 0..rows {
            assert!(data[i * cols..(i + 1) * cols].iter().all(|&x| x == i));
        }
    }

    #[test]
    fn test_par_chunks_offsets() {
        let mut data = vec![0usize; 100_000];
        par_chunks(VecMut::from_slice(&mut data), 1, 4096, &|offset, mut chunk: VecMut<'_, usize>| {
            for k in 0..chunk.len() {
                chunk.set(k, offset + k);
            }
        });
        assert!(data.iter().enumerate().all(|(k, &x)| k == x));
    }

    #[test]
    fn test_small_work_is_not_split() {
        let mut data = vec![0u8; 16];
        let calls = AtomicUsize::new(0);
        par_chunks(VecMut::from_slice(&mut data), 1, MIN_PARALLEL_WORK, &|offset, chunk: VecMut<'_, u8>| {
            assert_eq!(offset, 0);
            assert_eq!(chunk.len(), 16);
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
