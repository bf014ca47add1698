use std::collections::BTreeMap;

/// Project a set of allow-listed annotations from a source object onto a
/// target's annotation map.
///
/// `known_keys` is the full set of keys the caller ever mirrors. A key
/// present on `source` is copied/overwritten on the result; a key absent
/// from `source` but present in `known_keys` is removed from the result even
/// if it was previously set there by a prior reconcile. Any annotation on
/// `target` whose key is not in `known_keys` is preserved untouched, since it
/// belongs to another actor.
pub fn project_known_annotations(
    target: Option<BTreeMap<String, String>>,
    source: &BTreeMap<String, String>,
    known_keys: &[&str],
) -> BTreeMap<String, String> {
    let mut result = target.unwrap_or_default();
    for key in known_keys {
        match source.get(*key) {
            Some(value) => {
                result.insert((*key).to_string(), value.clone());
            }
            None => {
                result.remove(*key);
            }
        }
    }
    result
}

/// Project every annotation on `source` whose key starts with `prefix` onto
/// `target`, removing any previously-projected key under the same prefix
/// that is no longer present on `source`.
pub fn project_annotation_prefix(
    target: Option<BTreeMap<String, String>>,
    source: &BTreeMap<String, String>,
    prefix: &str,
) -> BTreeMap<String, String> {
    let mut result = target.unwrap_or_default();
    result.retain(|k, _| !k.starts_with(prefix) || source.contains_key(k));
    for (k, v) in source.iter().filter(|(k, _)| k.starts_with(prefix)) {
        result.insert(k.clone(), v.clone());
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn copies_known_keys_present_on_source() {
        let source = map(&[("hypershift.openshift.io/restart-date", "2026-01-01")]);
        let result = project_known_annotations(
            None,
            &source,
            &["hypershift.openshift.io/restart-date"],
        );
        assert_eq!(
            result.get("hypershift.openshift.io/restart-date"),
            Some(&"2026-01-01".to_string())
        );
    }

    #[test]
    fn removes_known_keys_no_longer_on_source() {
        let target = map(&[("hypershift.openshift.io/restart-date", "stale")]);
        let result = project_known_annotations(
            Some(target),
            &BTreeMap::new(),
            &["hypershift.openshift.io/restart-date"],
        );
        assert!(!result.contains_key("hypershift.openshift.io/restart-date"));
    }

    #[test]
    fn preserves_unrelated_keys() {
        let target = map(&[("someone-elses/annotation", "keep-me")]);
        let result = project_known_annotations(Some(target), &BTreeMap::new(), &["known"]);
        assert_eq!(
            result.get("someone-elses/annotation"),
            Some(&"keep-me".to_string())
        );
    }

    #[test]
    fn projects_prefixed_keys_and_drops_stale_ones() {
        let target = map(&[("idp-override/old", "gone"), ("other", "keep")]);
        let source = map(&[("idp-override/new", "value")]);
        let result = project_annotation_prefix(Some(target), &source, "idp-override/");
        assert_eq!(result.get("idp-override/new"), Some(&"value".to_string()));
        assert!(!result.contains_key("idp-override/old"));
        assert_eq!(result.get("other"), Some(&"keep".to_string()));
    }
}
