//! Category index
//!
//! Groups package names by the categories they declare, for browsing and
//! selection front-ends.

use std::collections::BTreeMap;

use crate::manifest::RepositoryIndex;

/// Name of the synthetic category listing every package
pub const ALL_CATEGORY: &str = "All";

/// Map category name to a sorted list of package names.
///
/// Always contains [`ALL_CATEGORY`], even for an empty index.
pub fn build_categories(index: &RepositoryIndex) -> BTreeMap<String, Vec<String>> {
    let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut all = Vec::with_capacity(index.len());

    for (name, record) in index.packages() {
        all.push(name.clone());
        for category in record.categories() {
            categories
                .entry(category.to_string())
                .or_default()
                .push(name.clone());
        }
    }

    categories.insert(ALL_CATEGORY.to_string(), all);
    for names in categories.values_mut() {
        names.sort();
        names.dedup();
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;

    #[test]
    fn test_categories_grouped_and_sorted() {
        let index = parse_manifest(
            "@ zsh\ncategory: Shells\n@ bash\ncategory: Base Shells\n@ gcc\ncategory: Devel\n@ orphan\n",
        )
        .unwrap();
        let cats = build_categories(&index);

        assert_eq!(cats["Shells"], vec!["bash", "zsh"]);
        assert_eq!(cats["Base"], vec!["bash"]);
        assert_eq!(cats["Devel"], vec!["gcc"]);
        assert_eq!(cats[ALL_CATEGORY], vec!["bash", "gcc", "orphan", "zsh"]);
        assert_eq!(cats.len(), 4);
    }

    #[test]
    fn test_empty_index_has_empty_all() {
        let cats = build_categories(&RepositoryIndex::default());
        assert_eq!(cats.len(), 1);
        assert!(cats[ALL_CATEGORY].is_empty());
    }

    #[test]
    fn test_repeated_category_listed_once() {
        let index = parse_manifest("@ a\ncategory: Base Base\n").unwrap();
        assert_eq!(build_categories(&index)["Base"], vec!["a"]);
    }
}
