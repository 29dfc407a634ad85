use serde::{Deserialize, Serialize};

/// The `apiVersion`/`kind` pair every Kubernetes-style document starts with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHeader {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
}

impl TypeHeader {
    /// Read the header from a document; `None` when it is not a YAML mapping
    pub fn parse(content: &str) -> Option<Self> {
        serde_yaml::from_str(content).ok()
    }

    /// Check for an exact group/version and kind
    pub fn is(&self, api_version: &str, kind: &str) -> bool {
        self.api_version == api_version && self.kind == kind
    }

    /// Whether this document only drives the KOTS control plane and has no
    /// place in a Helm chart
    pub fn is_control_plane(&self) -> bool {
        self.api_version.starts_with("kots.io")
            || self.api_version.starts_with("troubleshoot.replicated.com")
            || self.is("app.k8s.io/v1beta1", "Application")
    }
}

impl std::fmt::Display for TypeHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

/// Classify raw document text as a control-plane manifest
pub fn is_control_plane_manifest(content: &str) -> bool {
    TypeHeader::parse(content).is_some_and(|header| header.is_control_plane())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let header = TypeHeader::parse("apiVersion: apps/v1\nkind: Deployment\n").unwrap();
        assert_eq!(header.api_version, "apps/v1");
        assert_eq!(header.kind, "Deployment");
        assert_eq!(header.to_string(), "apps/v1/Deployment");
    }

    #[test]
    fn test_parse_header_not_yaml_mapping() {
        assert!(TypeHeader::parse("just some text").is_none());
        assert!(TypeHeader::parse("- a\n- b\n").is_none());
    }

    #[test]
    fn test_control_plane_detection() {
        assert!(is_control_plane_manifest("apiVersion: kots.io/v1beta1\nkind: Config\n"));
        assert!(is_control_plane_manifest(
            "apiVersion: troubleshoot.replicated.com/v1beta1\nkind: Preflight\n"
        ));
        assert!(is_control_plane_manifest(
            "apiVersion: app.k8s.io/v1beta1\nkind: Application\n"
        ));
        assert!(!is_control_plane_manifest("apiVersion: app.k8s.io/v1beta1\nkind: Other\n"));
        assert!(!is_control_plane_manifest("apiVersion: v1\nkind: Service\n"));
        assert!(!is_control_plane_manifest("not: [valid"));
    }
}
