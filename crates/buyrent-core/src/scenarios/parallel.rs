//! Conditional parallel evaluation of grid points.
//!
//! Grid points share no mutable state, so each one can run on its own rayon
//! task. Without the `parallel` feature, or when the caller does not ask for
//! it, points run sequentially in grid order.

/// Maps `f` over `items`, in parallel when the `parallel` feature is enabled
/// and `parallel` is true. Output order always matches input order.
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if parallel && items.len() > 1 {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}
