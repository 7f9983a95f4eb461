//! Addon manifest (`addon.xml`) reader.
//!
//! A manifest's root element carries the addon `id` and `version`. Assets
//! (icon, fanart, screenshots) are declared inside the metadata extension:
//!
//! ```xml
//! <addon id="plugin.video.example" version="1.2.0">
//!   <extension point="xbmc.addon.metadata">
//!     <assets>
//!       <icon>resources/icon.png</icon>
//!       <fanart>resources/fanart.jpg</fanart>
//!     </assets>
//!   </extension>
//! </addon>
//! ```
//!
//! The exact source text of the root element is kept so the catalog can
//! embed it without re-serialising.

use crate::addon::{AddonId, AddonVersion};
use crate::package_error::{PackageError, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use roxmltree::{Document, Node, ParsingOptions};

/// File name of the manifest at the root of every package directory.
pub const MANIFEST_FILE_NAME: &str = "addon.xml";

/// Extension points whose `assets` block lists publishable files.
pub const METADATA_EXTENSION_POINTS: &[&str] = &["xbmc.addon.metadata", "kodi.addon.metadata"];

/// A parsed addon manifest.
///
/// Instances are never mutated; a rescan produces a new value that is
/// compared against the catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonManifest {
    id: AddonId,
    version: AddonVersion,
    raw: String,
    assets: Vec<Utf8PathBuf>,
}

impl AddonManifest {
    /// The addon identifier.
    #[must_use]
    pub const fn id(&self) -> &AddonId {
        &self.id
    }

    /// The addon version, compared literally.
    #[must_use]
    pub const fn version(&self) -> &AddonVersion {
        &self.version
    }

    /// Exact source text of the manifest's root element.
    #[must_use]
    pub fn raw_content(&self) -> &str {
        &self.raw
    }

    /// Declared asset paths, relative to the package directory, in
    /// declaration order.
    #[must_use]
    pub fn assets(&self) -> &[Utf8PathBuf] {
        &self.assets
    }

    /// Build a manifest from an element of a parsed document.
    ///
    /// `text` must be the document `node` was parsed from; `path` is used
    /// for diagnostics only.
    pub(crate) fn from_element(node: Node<'_, '_>, text: &str, path: &Utf8Path) -> Result<Self> {
        let raw_id = required_attribute(node, "id", path)?;
        let raw_version = required_attribute(node, "version", path)?;
        let id = AddonId::try_from(raw_id).map_err(|source| PackageError::InvalidField {
            path: path.to_owned(),
            source,
        })?;
        let version = AddonVersion::try_from(raw_version).map_err(|source| {
            PackageError::InvalidField {
                path: path.to_owned(),
                source,
            }
        })?;
        let raw = text
            .get(node.range())
            .ok_or_else(|| PackageError::ManifestParse {
                path: path.to_owned(),
                reason: "element range falls outside the document".to_owned(),
            })?
            .to_owned();

        Ok(Self {
            id,
            version,
            raw,
            assets: declared_assets(node, path),
        })
    }
}

/// Read and parse `<package_dir>/addon.xml`.
///
/// # Errors
///
/// Manifests are expected in UTF-8; a file that is not valid UTF-8 is
/// accepted only when its XML declaration names ISO-8859-1.
///
/// # Errors
///
/// Returns [`PackageError::ManifestRead`] when the file cannot be read,
/// [`PackageError::ManifestParse`] when it is in an unsupported encoding,
/// or any error from [`parse_manifest`].
pub fn read_manifest(package_dir: &Utf8Path) -> Result<AddonManifest> {
    let path = package_dir.join(MANIFEST_FILE_NAME);
    let bytes = std::fs::read(&path).map_err(|source| PackageError::ManifestRead {
        path: path.clone(),
        source,
    })?;
    let text = decode_manifest(bytes, &path)?;
    parse_manifest(&text, &path)
}

/// Decode manifest bytes as UTF-8, falling back to a declared Latin-1.
fn decode_manifest(bytes: Vec<u8>, path: &Utf8Path) -> Result<String> {
    let invalid = match String::from_utf8(bytes) {
        Ok(text) => return Ok(text),
        Err(err) => err,
    };
    let raw = invalid.as_bytes();
    let encoding = declared_encoding(raw).unwrap_or_default();
    if LATIN1_LABELS.contains(&encoding.to_ascii_lowercase().as_str()) {
        let decoded: String = raw.iter().copied().map(char::from).collect();
        // The text is now UTF-8; the declaration must say so.
        return Ok(decoded.replacen(encoding.as_str(), "UTF-8", 1));
    }
    Err(PackageError::ManifestParse {
        path: path.to_owned(),
        reason: format!(
            "{}; declared encoding \"{encoding}\" is not supported",
            invalid.utf8_error()
        ),
    })
}

/// Encoding labels decoded byte-for-byte into Unicode.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "latin1",
    "latin-1",
    "l1",
];

/// The `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let after_open = bytes.strip_prefix(b"<?xml")?;
    let close = after_open.windows(2).position(|pair| pair == b"?>")?;
    let declaration = String::from_utf8_lossy(after_open.get(..close)?);
    let (_, after_name) = declaration.split_once("encoding")?;
    let quoted = after_name.trim_start().strip_prefix('=')?.trim_start();
    let value = quoted.strip_prefix(['"', '\''])?;
    value.split(['"', '\'']).next().map(str::to_owned)
}

/// Parse manifest text; `path` is used for diagnostics only.
///
/// # Errors
///
/// Returns [`PackageError::ManifestParse`] for malformed XML,
/// [`PackageError::MissingField`] when `id` or `version` is absent, and
/// [`PackageError::InvalidField`] when either is unusable.
pub fn parse_manifest(text: &str, path: &Utf8Path) -> Result<AddonManifest> {
    let body = strip_bom(text);
    let document = parse_document(body).map_err(|err| PackageError::ManifestParse {
        path: path.to_owned(),
        reason: err.to_string(),
    })?;
    AddonManifest::from_element(document.root_element(), body, path)
}

/// Drop a leading UTF-8 byte-order mark.
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Parse an XML document. A `<!DOCTYPE>` is allowed; external entities are
/// never fetched.
pub(crate) fn parse_document(text: &str) -> std::result::Result<Document<'_>, roxmltree::Error> {
    Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
}

fn required_attribute<'a>(
    node: Node<'a, '_>,
    name: &'static str,
    path: &Utf8Path,
) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| PackageError::MissingField {
        path: path.to_owned(),
        field: name,
    })
}

/// Collect the asset paths declared by every metadata extension.
fn declared_assets(root: Node<'_, '_>, path: &Utf8Path) -> Vec<Utf8PathBuf> {
    root.children()
        .filter(|child| child.has_tag_name("extension"))
        .filter(|extension| {
            extension
                .attribute("point")
                .is_some_and(|point| METADATA_EXTENSION_POINTS.contains(&point))
        })
        .filter_map(|extension| extension.children().find(|child| child.has_tag_name("assets")))
        .flat_map(|assets| assets.children().filter(Node::is_element))
        .filter_map(|asset| asset.text().map(str::trim))
        .filter(|text| !text.is_empty())
        .filter_map(|text| {
            let candidate = Utf8PathBuf::from(text);
            if is_contained(&candidate) {
                Some(candidate)
            } else {
                log::warn!("{path}: ignoring asset outside the package: {text}");
                None
            }
        })
        .collect()
}

/// Returns `true` for relative paths that cannot climb out of their base.
fn is_contained(path: &Utf8Path) -> bool {
    path.components()
        .all(|component| matches!(component, Utf8Component::Normal(_) | Utf8Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<addon id="plugin.video.example" name="Example" version="1.2.0" provider-name="me">
  <requires>
    <import addon="xbmc.python" version="3.0.0"/>
  </requires>
  <extension point="xbmc.python.pluginsource" library="main.py"/>
  <extension point="xbmc.addon.metadata">
    <summary lang="en_GB">Example</summary>
    <assets>
      <icon>resources/icon.png</icon>
      <fanart>resources/fanart.jpg</fanart>
      <screenshot></screenshot>
      <screenshot> resources/screenshot-01.jpg </screenshot>
    </assets>
  </extension>
</addon>
"#;

    fn parse(text: &str) -> Result<AddonManifest> {
        parse_manifest(text, Utf8Path::new("example/addon.xml"))
    }

    #[test]
    fn extracts_identity() {
        let manifest = parse(MANIFEST).expect("valid manifest");
        assert_eq!(manifest.id().as_str(), "plugin.video.example");
        assert_eq!(manifest.version().as_str(), "1.2.0");
    }

    #[test]
    fn raw_content_is_the_root_element_source() {
        let manifest = parse(MANIFEST).expect("valid manifest");
        assert!(manifest.raw_content().starts_with("<addon id=\"plugin.video.example\""));
        assert!(manifest.raw_content().ends_with("</addon>"));
        assert!(!manifest.raw_content().contains("<?xml"));
    }

    #[test]
    fn assets_keep_declaration_order_and_skip_blanks() {
        let manifest = parse(MANIFEST).expect("valid manifest");
        let assets: Vec<&str> = manifest.assets().iter().map(|asset| asset.as_str()).collect();
        assert_eq!(
            assets,
            vec![
                "resources/icon.png",
                "resources/fanart.jpg",
                "resources/screenshot-01.jpg"
            ]
        );
    }

    #[rstest]
    #[case::kodi_point("kodi.addon.metadata", 1)]
    #[case::xbmc_point("xbmc.addon.metadata", 1)]
    #[case::other_point("xbmc.python.script", 0)]
    fn only_metadata_points_declare_assets(#[case] point: &str, #[case] expected: usize) {
        let text = format!(
            r#"<addon id="a" version="1"><extension point="{point}"><assets><icon>icon.png</icon></assets></extension></addon>"#
        );
        let manifest = parse(&text).expect("valid manifest");
        assert_eq!(manifest.assets().len(), expected);
    }

    #[test]
    fn absent_asset_block_is_valid() {
        let manifest = parse(r#"<addon id="a" version="1"/>"#).expect("valid manifest");
        assert!(manifest.assets().is_empty());
    }

    #[rstest]
    #[case::missing_id(r#"<addon version="1"/>"#, "id")]
    #[case::missing_version(r#"<addon id="a"/>"#, "version")]
    fn missing_attributes_are_reported(#[case] text: &str, #[case] field: &str) {
        let err = parse(text).expect_err("required attribute missing");
        assert!(matches!(err, PackageError::MissingField { field: f, .. } if f == field));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = parse("<addon id=\"a\" version=\"1\">").expect_err("unterminated");
        assert!(matches!(err, PackageError::ManifestParse { .. }));
    }

    #[test]
    fn path_like_id_is_rejected() {
        let err = parse(r#"<addon id="../evil" version="1"/>"#).expect_err("invalid id");
        assert!(matches!(err, PackageError::InvalidField { .. }));
    }

    #[test]
    fn escaping_assets_are_dropped() {
        let text = r#"<addon id="a" version="1"><extension point="kodi.addon.metadata"><assets><icon>../../etc/passwd</icon><fanart>/abs.jpg</fanart><banner>ok.png</banner></assets></extension></addon>"#;
        let manifest = parse(text).expect("valid manifest");
        assert_eq!(manifest.assets(), &[Utf8PathBuf::from("ok.png")]);
    }

    #[test]
    fn byte_order_mark_is_tolerated() {
        let text = format!("\u{feff}{MANIFEST}");
        let manifest = parse(&text).expect("BOM-prefixed manifest");
        assert_eq!(manifest.id().as_str(), "plugin.video.example");
    }

    #[test]
    fn doctype_declaration_is_accepted() {
        let text = "<?xml version=\"1.0\"?>\n<!DOCTYPE addon>\n<addon id=\"a\" version=\"1\"/>";
        let manifest = parse(text).expect("DOCTYPE is well-formed");
        assert_eq!(manifest.raw_content(), r#"<addon id="a" version="1"/>"#);
    }

    #[test]
    fn read_manifest_reports_missing_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");
        let err = read_manifest(&root).expect_err("no manifest");
        assert!(matches!(err, PackageError::ManifestRead { .. }));
    }

    fn write_manifest_bytes(bytes: &[u8]) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");
        std::fs::write(root.join(MANIFEST_FILE_NAME), bytes).expect("manifest");
        (dir, root)
    }

    #[rstest]
    #[case::upper("ISO-8859-1")]
    #[case::alias("latin1")]
    fn latin1_manifest_is_transcoded(#[case] label: &str) {
        let mut bytes = format!(
            "<?xml version=\"1.0\" encoding=\"{label}\"?>\n<addon id=\"a\" version=\"1\" name=\"Caf"
        )
        .into_bytes();
        bytes.extend_from_slice(b"\xe9\"/>");
        let (_dir, root) = write_manifest_bytes(&bytes);

        let manifest = read_manifest(&root).expect("declared Latin-1 is decoded");

        assert_eq!(manifest.raw_content(), "<addon id=\"a\" version=\"1\" name=\"Caf\u{e9}\"/>");
    }

    #[test]
    fn undeclared_non_utf8_manifest_is_a_parse_error() {
        let (_dir, root) = write_manifest_bytes(b"<addon id=\"a\" version=\"1\" name=\"\xff\"/>");

        let err = read_manifest(&root).expect_err("not UTF-8");

        assert!(matches!(err, PackageError::ManifestParse { .. }), "{err}");
    }
}
