//! Publish override merging.
//!
//! Layers are applied base first, then the layer for the active publish
//! mode. `true` and strings normalize to objects; `false` disables; a later
//! object re-enables and overrides key by key.

use super::spec::{BuildSpec, PublishConfig, PublishSpec, ServiceDeclaration};
use super::target::PublishMode;
use std::path::Path;

/// Effective overrides for one publish mode.
#[derive(Debug, Clone, Default)]
pub struct PublishOverrides {
    pub src: Option<String>,
    pub base: Option<String>,
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub build: Option<BuildSpec>,
}

impl PublishOverrides {
    fn apply(&mut self, layer: &PublishConfig) {
        if layer.src.is_some() {
            self.src = layer.src.clone();
        }
        if layer.base.is_some() {
            self.base = layer.base.clone();
        }
        if layer.url.is_some() {
            self.url = layer.url.clone();
        }
        if layer.host.is_some() {
            self.host = layer.host.clone();
        }
        if layer.port.is_some() {
            self.port = layer.port;
        }
        if layer.build.is_some() {
            self.build = layer.build.clone();
        }
    }

    /// Replace the declaration's own values with the overrides.
    ///
    /// A publish `src` that is itself a URL becomes the service URL.
    pub fn apply_to(&mut self, declaration: &mut ServiceDeclaration, root: &Path) {
        if let Some(src) = self.src.take() {
            if super::spec::is_valid_url(&src, root) {
                declaration.url = Some(src);
            } else {
                self.src = Some(src);
            }
        }
        if self.url.is_some() {
            declaration.url = self.url.clone();
        }
        if self.host.is_some() {
            declaration.host = self.host.clone();
        }
        if self.port.is_some() {
            declaration.port = self.port;
        }
        if self.build.is_some() {
            declaration.build = self.build.clone();
        }
    }
}

enum Layer<'a> {
    Disable,
    Enable(Option<&'a PublishConfig>),
    Src(&'a str),
}

fn layer(spec: &PublishSpec) -> Layer<'_> {
    match spec {
        PublishSpec::Enabled(false) => Layer::Disable,
        PublishSpec::Enabled(true) => Layer::Enable(None),
        PublishSpec::Src(src) => Layer::Src(src),
        PublishSpec::Config(config) => Layer::Enable(Some(config)),
    }
}

/// Merge the base publish spec with its `local`/`remote` layer.
///
/// Returns `None` when publishing is disabled for `mode`.
pub fn merge_publish(spec: Option<&PublishSpec>, mode: PublishMode) -> Option<PublishOverrides> {
    let Some(spec) = spec else {
        return Some(PublishOverrides::default());
    };

    let specific = match spec {
        PublishSpec::Config(config) => match mode {
            PublishMode::Local => config.local.as_ref(),
            PublishMode::Remote => config.remote.as_ref(),
        },
        _ => None,
    };

    let mut merged = Some(PublishOverrides::default());
    for spec in std::iter::once(spec).chain(specific) {
        match layer(spec) {
            Layer::Disable => merged = None,
            Layer::Enable(config) => {
                let overrides = merged.get_or_insert_with(PublishOverrides::default);
                if let Some(config) = config {
                    overrides.apply(config);
                }
            }
            Layer::Src(src) => {
                merged.get_or_insert_with(PublishOverrides::default).src = Some(src.to_string());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(raw: &str) -> PublishSpec {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_absent_publish_is_enabled() {
        let merged = merge_publish(None, PublishMode::Local).unwrap();
        assert!(merged.src.is_none());
    }

    #[test]
    fn test_false_disables() {
        assert!(merge_publish(Some(&parse("false")), PublishMode::Remote).is_none());
    }

    #[test]
    fn test_mode_layer_wins_key_by_key() {
        let spec = parse(
            r#"{ "port": 4000, "host": "0.0.0.0", "local": { "port": 5000 }, "remote": { "url": "https://api.example.com" } }"#,
        );

        let local = merge_publish(Some(&spec), PublishMode::Local).unwrap();
        assert_eq!(local.port, Some(5000));
        assert_eq!(local.host.as_deref(), Some("0.0.0.0"));
        assert!(local.url.is_none());

        let remote = merge_publish(Some(&spec), PublishMode::Remote).unwrap();
        assert_eq!(remote.port, Some(4000));
        assert_eq!(remote.url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn test_mode_layer_disables_only_that_mode() {
        let spec = parse(r#"{ "src": "api", "remote": false }"#);
        assert!(merge_publish(Some(&spec), PublishMode::Remote).is_none());
        let local = merge_publish(Some(&spec), PublishMode::Local).unwrap();
        assert_eq!(local.src.as_deref(), Some("api"));
    }

    #[test]
    fn test_string_layer_sets_src() {
        let spec = parse(r#"{ "base": "./dist", "local": "server" }"#);
        let local = merge_publish(Some(&spec), PublishMode::Local).unwrap();
        assert_eq!(local.src.as_deref(), Some("server"));
        assert_eq!(local.base.as_deref(), Some("./dist"));
    }

    #[test]
    fn test_nested_mode_layers_are_ignored() {
        let spec = parse(r#"{ "local": { "port": 5000, "local": { "port": 6000 } } }"#);
        let local = merge_publish(Some(&spec), PublishMode::Local).unwrap();
        assert_eq!(local.port, Some(5000));
    }

    #[test]
    fn test_url_src_becomes_service_url() {
        let temp_dir = TempDir::new().unwrap();
        let mut declaration = ServiceDeclaration::default().src("./api.py");
        let mut overrides = merge_publish(
            Some(&parse(r#""https://api.example.com""#)),
            PublishMode::Remote,
        )
        .unwrap();

        overrides.apply_to(&mut declaration, temp_dir.path());
        assert_eq!(declaration.url.as_deref(), Some("https://api.example.com"));
        assert_eq!(declaration.src.as_deref(), Some("./api.py"));
        assert!(overrides.src.is_none());
    }
}
