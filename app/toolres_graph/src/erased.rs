/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Type erasure for keys of different types stored in one map.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use dupe::Dupe;

pub(crate) trait ErasedKey: Display + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn ErasedKey) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
}

impl<K> ErasedKey for K
where
    K: Display + Eq + Hash + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn ErasedKey) -> bool {
        other.as_any().downcast_ref::<K>() == Some(self)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<K>().hash(&mut state);
        self.hash(&mut state);
    }
}

#[derive(Clone, Dupe)]
pub(crate) struct AnyKey(Arc<dyn ErasedKey>);

impl AnyKey {
    pub(crate) fn new<K: Display + Eq + Hash + Send + Sync + 'static>(key: K) -> AnyKey {
        AnyKey(Arc::new(key))
    }
}

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(&*other.0)
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_dyn(state)
    }
}

impl Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&*self.0, f)
    }
}

/// Value of any key.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_same_value_different_types() {
        #[derive(Hash, Eq, PartialEq, derive_more::Display)]
        struct A(u32);
        #[derive(Hash, Eq, PartialEq, derive_more::Display)]
        struct B(u32);

        assert!(AnyKey::new(A(1)) == AnyKey::new(A(1)));
        assert!(AnyKey::new(A(1)) != AnyKey::new(A(2)));
        assert!(AnyKey::new(A(1)) != AnyKey::new(B(1)));

        let set: HashSet<AnyKey> = [AnyKey::new(A(1)), AnyKey::new(B(1)), AnyKey::new(A(1))]
            .into_iter()
            .collect();
        assert_eq!(2, set.len());
    }
}
