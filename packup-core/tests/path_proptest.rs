use std::path::PathBuf;

use packup_core::path_utils::{contains, find_common_ancestor};
use proptest::prelude::*;

fn gen_file() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec("[a-c]{1,2}", 1..5).prop_map(|segments| {
        let mut path = PathBuf::from("/root");
        for segment in segments {
            path.push(segment);
        }
        path.set_extension("js");
        path
    })
}

proptest! {
    #[test]
    fn test_common_ancestor_contains_every_file(files in prop::collection::vec(gen_file(), 1..8)) {
        let ancestor = find_common_ancestor(&files);
        prop_assert!(ancestor.is_some());
        let ancestor = ancestor.unwrap();
        for file in &files {
            prop_assert!(contains(&ancestor, file), "{:?} does not contain {:?}", ancestor, file);
        }
    }

    #[test]
    fn test_common_ancestor_is_the_nearest(files in prop::collection::vec(gen_file(), 1..8)) {
        let ancestor = find_common_ancestor(&files).unwrap();
        // No child of the ancestor holds every file.
        for file in &files {
            if let Ok(rest) = file.strip_prefix(&ancestor) {
                if let Some(first) = rest.components().next() {
                    let child = ancestor.join(first);
                    let all_inside = files.iter().all(|f| f.parent().map_or(false, |p| contains(&child, p)));
                    prop_assert!(!all_inside, "{:?} is a nearer ancestor than {:?}", child, ancestor);
                }
            }
        }
    }

    #[test]
    fn test_common_ancestor_ignores_order(mut files in prop::collection::vec(gen_file(), 1..8)) {
        let forward = find_common_ancestor(&files);
        files.reverse();
        prop_assert_eq!(forward, find_common_ancestor(&files));
    }
}
