// SPDX-License-Identifier: Apache-2.0 OR MIT

// Layering of user values.
//
// If `force` is true, an incoming value overrides the existing one.
// If false, the existing value is kept and the incoming value ignored.
//
// Defaults files are merged without `force`, so the first file that assigns
// a symbol wins. The project config and interactive edits are merged with
// `force`.

use crate::{config::Selection, value::UserValue};

pub(crate) trait Merge {
    /// Merges `from` into `self`, returning `true` if `self` was changed.
    fn merge(&mut self, from: Self, force: bool) -> bool;
}

macro_rules! merge_non_container {
    ($($ty:tt)*) => {
        impl Merge for $($ty)* {
            fn merge(&mut self, from: Self, force: bool) -> bool {
                if force {
                    *self = from;
                }
                force
            }
        }
    };
}
merge_non_container!(UserValue);
merge_non_container!(Selection);

impl<T: Merge> Merge for Option<T> {
    fn merge(&mut self, from: Self, force: bool) -> bool {
        match (self, from) {
            (_, None) => false,
            (this @ None, from) => {
                *this = from;
                true
            }
            (Some(this), Some(from)) => this.merge(from, force),
        }
    }
}
