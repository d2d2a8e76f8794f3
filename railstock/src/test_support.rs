//! Fixtures shared by unit tests.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::blueprint::{LanguagePreferencePicker, XmlBlueprintDecoder, DELTA_NAMESPACE};
use crate::identity::split_segments;
use crate::storage::{Archive, ArchiveReader, SessionCache, StorageResolver, ZipArchiveReader};
use crate::vehicle::{CsvNumberingLoader, VehicleResolver};

/// Write `bytes` to `root/<relative>`, creating directories.
pub fn write_asset(root: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = split_segments(relative).fold(root.to_path_buf(), |path, s| path.join(s));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Write a stored (uncompressed) zip archive.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// Zip reader that counts how often archives are opened.
#[derive(Default)]
pub struct CountingReader {
    inner: ZipArchiveReader,
    opens: AtomicUsize,
}

impl CountingReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ArchiveReader for CountingReader {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn Archive>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(path)
    }
}

/// Temp assets root with a storage resolver and bundled collaborators.
pub struct TestEngine {
    _temp: TempDir,
    assets: PathBuf,
    storage: Arc<StorageResolver>,
}

impl TestEngine {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let assets = temp.path().join("Assets");
        fs::create_dir_all(&assets).unwrap();
        let storage = Arc::new(
            StorageResolver::new(
                &assets,
                Arc::new(SessionCache::new()),
                Arc::new(ZipArchiveReader::new()),
            )
            .with_temp_dir(temp.path().join("extract")),
        );

        Self {
            _temp: temp,
            assets,
            storage,
        }
    }

    pub fn assets(&self) -> &Path {
        &self.assets
    }

    pub fn vehicles(&self) -> VehicleResolver {
        VehicleResolver::new(
            Arc::clone(&self.storage),
            Arc::new(XmlBlueprintDecoder::new()),
            Arc::new(LanguagePreferencePicker::default()),
            Arc::new(CsvNumberingLoader::new(Arc::clone(&self.storage))),
        )
    }
}

fn document(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <cBlueprintLoader xmlns:d=\"{DELTA_NAMESPACE}\" d:version=\"1.0\">\
         <Blueprint>{body}</Blueprint></cBlueprintLoader>"
    )
}

fn localised(text: &str) -> String {
    format!(
        "<DisplayName><Localisation-cUserLocalisedString>\
         <English d:type=\"cDeltaString\">{text}</English>\
         <Key d:type=\"cDeltaString\">0b1f3a</Key>\
         </Localisation-cUserLocalisedString></DisplayName>"
    )
}

fn absolute_id(provider: &str, product: &str, blueprint_id: &str) -> String {
    format!(
        "<iBlueprintLibrary-cAbsoluteBlueprintID><BlueprintSetID>\
         <iBlueprintLibrary-cBlueprintSetID>\
         <Provider d:type=\"cDeltaString\">{provider}</Provider>\
         <Product d:type=\"cDeltaString\">{product}</Product>\
         </iBlueprintLibrary-cBlueprintSetID></BlueprintSetID>\
         <BlueprintID d:type=\"cDeltaString\">{blueprint_id}</BlueprintID>\
         </iBlueprintLibrary-cAbsoluteBlueprintID>"
    )
}

/// Builder for engine, wagon and tender blueprints.
pub struct LeafBlueprint {
    tag: &'static str,
    name: String,
    display_name: Option<String>,
    entities: usize,
    cargo: Vec<Option<(String, String)>>,
    numbering: Option<String>,
}

impl LeafBlueprint {
    fn new(tag: &'static str, name: &str) -> Self {
        Self {
            tag,
            name: name.to_string(),
            display_name: None,
            entities: 0,
            cargo: Vec::new(),
            numbering: None,
        }
    }

    pub fn engine(name: &str) -> Self {
        Self::new("cEngineBlueprint", name)
    }

    pub fn wagon(name: &str) -> Self {
        Self::new("cWagonBlueprint", name)
    }

    pub fn tender(name: &str) -> Self {
        Self::new("cTenderBlueprint", name)
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    pub fn with_entities(mut self, entities: usize) -> Self {
        self.entities = entities;
        self
    }

    /// Add a cargo definition; `None` omits its `Capacity` node.
    pub fn with_cargo(mut self, capacity: Option<(&str, &str)>) -> Self {
        self.cargo
            .push(capacity.map(|(value, raw)| (value.to_string(), raw.to_string())));
        self
    }

    pub fn with_numbering(mut self, reference: &str) -> Self {
        self.numbering = Some(reference.to_string());
        self
    }

    pub fn xml(&self) -> String {
        let mut body = format!("<Name>{}</Name>", self.name);

        if let Some(display_name) = &self.display_name {
            body.push_str(&localised(display_name));
        }
        if !self.cargo.is_empty() {
            body.push_str("<CargoDef>");
            for cargo in &self.cargo {
                match cargo {
                    Some((value, raw)) => body.push_str(&format!(
                        "<cBulkCargoDef><Capacity d:type=\"sFloat32\" \
                         d:alt_encoding=\"{raw}\" d:precision=\"string\">{value}</Capacity>\
                         </cBulkCargoDef>"
                    )),
                    None => body.push_str("<cBulkCargoDef/>"),
                }
            }
            body.push_str("</CargoDef>");
        }
        if let Some(reference) = &self.numbering {
            body.push_str(&format!(
                "<NumberingList><cCSVContainer>\
                 <CsvFile d:type=\"cDeltaString\">{reference}</CsvFile>\
                 </cCSVContainer></NumberingList>"
            ));
        }
        body.push_str("<cEntityContainerBlueprint><Children>");
        for i in 0..self.entities {
            body.push_str(&format!(
                "<cEntityContainerBlueprint-sChild d:id=\"{i}\"/>"
            ));
        }
        body.push_str("</Children></cEntityContainerBlueprint>");

        document(&format!("<{tag}>{body}</{tag}>", tag = self.tag))
    }
}

/// A reskin of `provider\product\blueprint_id`.
pub fn reskin_xml(name: &str, provider: &str, product: &str, blueprint_id: &str) -> String {
    document(&format!(
        "<cReskinBlueprint><Name>{name}</Name>\
         <ReskinAssetBpId>{}</ReskinAssetBpId></cReskinBlueprint>",
        absolute_id(provider, product, blueprint_id)
    ))
}

/// One consist entry of a preload fixture.
#[derive(Debug, Clone)]
pub struct ConsistEntry {
    provider: String,
    product: String,
    blueprint_id: String,
    flipped: bool,
}

impl ConsistEntry {
    pub fn new(provider: &str, product: &str, blueprint_id: &str, flipped: bool) -> Self {
        Self {
            provider: provider.to_string(),
            product: product.to_string(),
            blueprint_id: blueprint_id.to_string(),
            flipped,
        }
    }
}

/// A consist or consist-fragment blueprint.
pub fn consist_xml(tag: &str, display_name: Option<&str>, entries: &[ConsistEntry]) -> String {
    let mut body = String::new();
    if let Some(display_name) = display_name {
        body.push_str(&localised(display_name));
    }
    body.push_str("<ConsistEntries>");
    for entry in entries {
        let flipped = if entry.flipped { "eTrue" } else { "eFalse" };
        body.push_str(&format!(
            "<cConsistEntry><BlueprintID>{}</BlueprintID>\
             <Flipped d:type=\"bool\">{flipped}</Flipped></cConsistEntry>",
            absolute_id(&entry.provider, &entry.product, &entry.blueprint_id)
        ));
    }
    body.push_str("</ConsistEntries>");

    document(&format!("<{tag}>{body}</{tag}>"))
}
