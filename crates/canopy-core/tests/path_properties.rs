//! Property tests for namespace resolution invariants.

use canopy_core::{Canopy, Config};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "a", "b", "c", "math", "svc", "util", "store", "node_1", "v2", "_private",
    ])
    .prop_map(str::to_string)
}

fn dotted_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join("."))
}

proptest! {
    /// Resolving the same path twice yields the identical node.
    #[test]
    fn resolution_is_idempotent(path in dotted_path()) {
        let canopy = Canopy::new(Config::default());
        let first = canopy.namespace(&path).expect("valid path resolves");
        let second = canopy.namespace(&path).expect("valid path resolves again");
        prop_assert!(first.ptr_eq(&second));
        prop_assert_eq!(first.path(), format!("canopy.{path}"));
    }

    /// Every prefix of a path resolves to an ancestor of the path's node.
    #[test]
    fn prefixes_resolve_to_ancestors(path in dotted_path()) {
        let canopy = Canopy::new(Config::default());
        let node = canopy.namespace(&path).expect("valid path resolves");
        let segments: Vec<&str> = path.split('.').collect();
        for end in 1..=segments.len() {
            let prefix = segments[..end].join(".");
            let ancestor = canopy.namespace(&prefix).expect("prefix resolves");
            prop_assert!(ancestor.is_ancestor_of(&node), "{prefix} is not an ancestor of {path}");
        }
    }

    /// Resolution order does not change the resulting tree.
    #[test]
    fn resolution_order_is_irrelevant(paths in prop::collection::vec(dotted_path(), 1..6)) {
        let forward = Canopy::new(Config::default());
        let backward = Canopy::new(Config::default());
        for path in &paths {
            forward.namespace(path).expect("resolve forward");
        }
        for path in paths.iter().rev() {
            backward.namespace(path).expect("resolve backward");
        }
        for path in &paths {
            let a = forward.namespace(path).expect("re-resolve forward");
            let b = backward.namespace(path).expect("re-resolve backward");
            prop_assert_eq!(a.path(), b.path());
        }
    }
}
