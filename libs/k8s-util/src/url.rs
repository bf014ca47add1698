//! Collapse resource names out of Kubernetes API paths so HTTP client metrics
//! don't explode into one time series per object.
//!
//! `/api/v1/namespaces/foo/secrets/bar` -> `/api/v1/namespaces/{namespace}/secrets/{name}`

const NAMED_COLLECTIONS: &[&str] = &[
    "namespaces",
    "secrets",
    "configmaps",
    "services",
    "events",
    "hostedclusters",
    "hostedcontrolplanes",
    "clusters",
    "roles",
    "rolebindings",
];

pub fn template_path(path: &str, _method: Option<&str>) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut out = Vec::with_capacity(segments.len());
    let mut prev_was_collection = false;
    for segment in segments {
        if prev_was_collection && !segment.is_empty() {
            out.push(if segment == "status" {
                segment.to_string()
            } else {
                "{name}".to_string()
            });
            prev_was_collection = false;
            continue;
        }
        prev_was_collection = NAMED_COLLECTIONS.contains(&segment);
        out.push(segment.to_string());
    }
    out.join("/")
}

#[cfg(test)]
mod test {
    use super::template_path;

    #[test]
    fn templates_namespaced_resource_paths() {
        assert_eq!(
            template_path("/api/v1/namespaces/foo/secrets/bar", None),
            "/api/v1/namespaces/{name}/secrets/{name}"
        );
    }

    #[test]
    fn leaves_status_subresource_alone() {
        assert_eq!(
            template_path(
                "/apis/hypershift.io/v1beta1/namespaces/foo/hostedclusters/bar/status",
                None
            ),
            "/apis/hypershift.io/v1beta1/namespaces/{name}/hostedclusters/{name}/status"
        );
    }

    #[test]
    fn leaves_unrecognized_paths_untouched() {
        assert_eq!(template_path("/healthz", None), "/healthz");
    }
}
