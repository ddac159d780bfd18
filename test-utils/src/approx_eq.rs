// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{fmt::Debug, iter};

use float_cmp::ApproxEq;
use ndarray::{ArrayBase, Data, Dimension, IntoDimension, Ix};

/// Asserts that two float containers are approximately equal.
///
/// The first argument is the float type of the leaves. The margin is given by `ulps` (defaults to
/// `2`) and `epsilon` (defaults to `0`). Two NaN leaves are considered equal.
///
/// ```
/// use ndarray::arr2;
/// use xayn_test_utils::assert_approx_eq;
///
/// assert_approx_eq!(f32, 0.150_391_55, 0.150_391_6, ulps = 3);
/// assert_approx_eq!(f32, [[0., 1.], [1., 0.]], arr2(&[[0., 1.], [1., 0.]]));
/// assert_approx_eq!(f32, vec![0.5, 1.5], [0.5, 1.49], epsilon = 0.1);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($t:ty, $left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, ulps = $ulps:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = $ulps)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = $epsilon, ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr, ulps = $ulps:expr $(,)?) => {{
        let (epsilon, ulps) = ($epsilon, $ulps);
        $crate::assert_iter_approx_eq::<$t>(
            $crate::ApproxEqIter::<$t>::indexed_iter_logical_order(&$left, Vec::new()),
            $crate::ApproxEqIter::<$t>::indexed_iter_logical_order(&$right, Vec::new()),
            |left, right| $crate::approx_eq!($t, left, right, epsilon = epsilon, ulps = ulps),
            format_args!("epsilon = {epsilon:?}, ulps = {ulps:?}"),
        );
    }};
}

/// Compares the leaves of two indexed iterators pairwise.
///
/// Used by [`assert_approx_eq!`], which should be preferred.
///
/// # Panics
/// Panics if the indices or lengths differ or if two leaves aren't approximately equal.
#[track_caller]
pub fn assert_iter_approx_eq<L>(
    mut left: impl Iterator<Item = (Vec<Ix>, L)>,
    mut right: impl Iterator<Item = (Vec<Ix>, L)>,
    approx_eq: impl Fn(L, L) -> bool,
    margin: impl Debug,
) where
    L: Copy + Debug + PartialEq,
{
    loop {
        match (left.next(), right.next()) {
            (Some((left_index, left_leaf)), Some((right_index, right_leaf))) => {
                assert_eq!(
                    left_index, right_index,
                    "Indices differ in logical order: {left_index:?} != {right_index:?}",
                );
                #[allow(clippy::eq_op)]
                let both_nan = left_leaf != left_leaf && right_leaf != right_leaf;
                assert!(
                    both_nan || approx_eq(left_leaf, right_leaf),
                    "Approximate equality failed ({margin:?}) at index {left_index:?}: {left_leaf:?} != {right_leaf:?}",
                );
            }
            (Some(leaf), None) => panic!("Left input is longer starting from index {leaf:?}"),
            (None, Some(leaf)) => panic!("Right input is longer starting from index {leaf:?}"),
            (None, None) => break,
        }
    }
}

/// Iterates the float leaves of a container together with their indices.
pub trait ApproxEqIter<'a, L>
where
    Self: 'a,
    L: ApproxEq + Copy,
{
    /// Iterates over all leaves in logical order, their indices prefixed by `index_prefix`.
    fn indexed_iter_logical_order(
        &'a self,
        index_prefix: Vec<Ix>,
    ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, L)>>;
}

fn push_index(index_prefix: &[Ix], index: Ix) -> Vec<Ix> {
    let mut index_prefix = index_prefix.to_vec();
    index_prefix.push(index);
    index_prefix
}

macro_rules! impl_approx_eq_iter {
    ($($t:ty),+ $(,)?) => {
        $(
            impl<'a> ApproxEqIter<'a, $t> for $t {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(iter::once((index_prefix, *self)))
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for &'a T
            where
                T: 'a + ApproxEqIter<'a, $t> + ?Sized,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    (**self).indexed_iter_logical_order(index_prefix)
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for [T]
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(self.iter().enumerate().flat_map(move |(index, leaf)| {
                        leaf.indexed_iter_logical_order(push_index(&index_prefix, index))
                    }))
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for Vec<T>
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    self.as_slice().indexed_iter_logical_order(index_prefix)
                }
            }

            impl<'a, T, const N: usize> ApproxEqIter<'a, $t> for [T; N]
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    self.as_slice().indexed_iter_logical_order(index_prefix)
                }
            }

            impl<'a, S, D> ApproxEqIter<'a, $t> for ArrayBase<S, D>
            where
                S: 'a + Data<Elem = $t>,
                D: 'a + Dimension,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(self.indexed_iter().map(move |(index, leaf)| {
                        let mut index_prefix = index_prefix.clone();
                        index_prefix.extend(index.into_dimension().as_array_view().iter());
                        (index_prefix, *leaf)
                    }))
                }
            }
        )+
    };
}

impl_approx_eq_iter! { f32, f64 }

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use ndarray::{arr1, arr2};

    #[test]
    fn test_scalars() {
        assert_approx_eq!(f32, 0.150_391_55, 0.150_391_6, ulps = 3);
        assert_approx_eq!(f64, 1., 1.);
        catch_unwind(|| assert_approx_eq!(f32, 0.150_391_55, 0.150_391_6, ulps = 2)).unwrap_err();
    }

    #[test]
    fn test_embeddings() {
        let embedding = arr1(&[0.5, -0.25]);
        assert_approx_eq!(f32, embedding, [0.5, -0.25]);
        assert_approx_eq!(f32, &embedding, vec![0.5, -0.25]);
        assert_approx_eq!(f32, embedding.view(), &[0.5, -0.25][..]);
    }

    #[test]
    fn test_distance_matrix() {
        let distances = arr2(&[[0., 1.5], [1.5, 0.]]);
        assert_approx_eq!(f32, distances, [[0., 1.5], [1.5, 0.]]);
        assert_approx_eq!(f32, distances, vec![vec![0., 1.5], vec![1.5, 0.]]);
    }

    #[test]
    #[should_panic(expected = "at index [1, 0]")]
    fn test_mismatch_index() {
        assert_approx_eq!(f32, arr2(&[[0., 1.], [1., 0.]]), [[0., 1.], [1.1, 0.]]);
    }

    #[test]
    #[should_panic(expected = "Right input is longer")]
    fn test_mismatch_length() {
        assert_approx_eq!(f32, [1., 2.], [1., 2., 3.]);
    }

    #[test]
    fn test_nan() {
        assert_approx_eq!(f32, [f32::NAN, 1.], [f32::NAN, 1.]);
        catch_unwind(|| assert_approx_eq!(f32, [f32::NAN, 1.], [0., 1.])).unwrap_err();
    }

    #[test]
    fn test_epsilon() {
        assert_approx_eq!(f32, 0.125, 0.625, epsilon = 0.5);
        catch_unwind(|| assert_approx_eq!(f32, 0.125, 0.625, epsilon = 0.49)).unwrap_err();
    }
}
