//! Batch configuration for the command line tool.
//!
//! ```toml
//! header = "// Code generated by go generate. DO NOT EDIT.\n\n"
//!
//! [[template]]
//! path = "queue/generic_queue.go"
//! types = "Something=int,string"
//! package = "queues"
//! ```

use std::path::{Path, PathBuf};
use serde_derive::Deserialize;
use crate::instantiate::GENERATED_HEADER;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Banner of generated files, empty disables it.
    #[serde(default)]
    header: Option<String>,
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateEntry>,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateEntry {
    pub path: PathBuf,
    /// Binding specification, `Key=int,string Other=NUMBERS`
    pub types: String,
    pub output: Option<PathBuf>,
    pub package: Option<String>,
    pub tag: Option<String>,
    /// One output file per assignment instead of a merged one.
    #[serde(default)]
    pub split: bool,
}

#[derive(Debug, thiserror::Error)]
enum LoadTomlErrorSource {
    #[error("Failed to read")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to load Toml file {path}")]
pub struct LoadTomlError {
    path: PathBuf,
    #[source]
    inner: LoadTomlErrorSource,
}

impl LoadTomlError {
    fn with_path<E: Into<LoadTomlErrorSource>, P: Into<PathBuf>>(path: P) -> impl FnOnce(E) -> Self {
        |error| LoadTomlError {
            path: path.into(),
            inner: error.into(),
        }
    }
}

pub fn load_toml<T: for<'a> serde::Deserialize<'a>, P: AsRef<Path>>(file: P) -> Result<T, LoadTomlError> {
    let file = file.as_ref();
    let manifest = std::fs::read(file).map_err(LoadTomlError::with_path(file))?;
    toml::from_slice(&manifest).map_err(LoadTomlError::with_path(file))
}

impl Manifest {
    /// Loads the manifest and makes its paths relative to the working directory.
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self, LoadTomlError> {
        let file = file.as_ref();
        let mut manifest = load_toml::<Manifest, _>(file)?;
        if let Some(dir) = file.parent() {
            manifest.resolve(dir);
        }
        Ok(manifest)
    }

    fn resolve(&mut self, dir: &Path) {
        for entry in &mut self.templates {
            entry.path = dir.join(&entry.path);
            if let Some(output) = &mut entry.output {
                *output = dir.join(&*output);
            }
        }
    }

    pub fn header(&self) -> Option<&str> {
        match self.header.as_deref() {
            None => Some(GENERATED_HEADER),
            Some("") => None,
            Some(header) => Some(header),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use super::Manifest;
    use crate::instantiate::GENERATED_HEADER;

    const MANIFEST: &str = r#"
[[template]]
path = "queue/generic_queue.go"
types = "Something=int,string"
package = "queues"

[[template]]
path = "maps/generic_simplemap.go"
types = "KeyType=string ValueType=NUMBERS"
output = "maps/numbers.go"
tag = "genny"
split = true
"#;

    #[test]
    fn parses_templates() {
        let manifest = toml::from_str::<Manifest>(MANIFEST).unwrap();
        assert_eq!(manifest.templates.len(), 2);
        assert_eq!(manifest.templates[0].types, "Something=int,string");
        assert_eq!(manifest.templates[0].package.as_deref(), Some("queues"));
        assert_eq!(manifest.templates[0].output, None);
        assert!(!manifest.templates[0].split);
        assert_eq!(manifest.templates[1].tag.as_deref(), Some("genny"));
        assert!(manifest.templates[1].split);
        assert_eq!(manifest.header(), Some(GENERATED_HEADER));
    }

    #[test]
    fn paths_are_relative_to_manifest() {
        let mut manifest = toml::from_str::<Manifest>(MANIFEST).unwrap();
        manifest.resolve(Path::new("project"));
        assert_eq!(manifest.templates[0].path, PathBuf::from("project/queue/generic_queue.go"));
        assert_eq!(manifest.templates[1].output, Some(PathBuf::from("project/maps/numbers.go")));
    }

    #[test]
    fn empty_header_disables_banner() {
        let manifest = toml::from_str::<Manifest>("header = \"\"\n").unwrap();
        assert_eq!(manifest.header(), None);
        assert!(manifest.templates.is_empty());

        let manifest = toml::from_str::<Manifest>("header = \"// custom\\n\"\n").unwrap();
        assert_eq!(manifest.header(), Some("// custom\n"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<Manifest>("[[template]]\npath = \"a.go\"\ntypes = \"A=int\"\npkg = \"x\"\n").is_err());
        assert!(toml::from_str::<Manifest>("headers = \"x\"\n").is_err());
    }

    #[test]
    fn types_are_required() {
        assert!(toml::from_str::<Manifest>("[[template]]\npath = \"a.go\"\n").is_err());
    }
}
