//! End-to-end build scenarios against a scripted baker.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use super::*;
use crate::bake::{BakedFile, collect_baked};
use crate::entity::read_gz;
use crate::prompt::{AssumeNo, AssumeYes};

/// Writes `<stem>.baked.<ext>` outputs the way the real tool lays them out,
/// and fails for any input whose stem starts with `broken`.
#[derive(Default)]
struct FakeBaker {
    calls: RefCell<Vec<(PathBuf, BakeKind)>>,
}

impl Baker for FakeBaker {
    fn bake(
        &self,
        input: &Path,
        output_dir: &Path,
        kind: BakeKind,
    ) -> Result<Vec<BakedFile>, BakeError> {
        self.calls.borrow_mut().push((input.to_path_buf(), kind));

        let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        if stem.starts_with("broken") {
            return Err(BakeError::ToolFailed {
                status: "exit status: 1".into(),
                stderr: "unsupported FBX version".into(),
            });
        }

        let root = crate::bake::baked_root(output_dir, input, kind);
        fs::create_dir_all(&root).unwrap();
        match kind {
            BakeKind::Texture => {
                fs::write(root.join(format!("{stem}.ktx")), b"KTX baked").unwrap();
            }
            BakeKind::Model => {
                fs::write(root.join(format!("{stem}.baked.fst")), b"fst").unwrap();
                let textures = root.join(format!("{stem}.fbm"));
                fs::create_dir_all(&textures).unwrap();
                fs::write(textures.join("wood.baked.ktx"), b"KTX wood").unwrap();
            }
        }
        collect_baked(&root)
    }
}

impl FakeBaker {
    fn calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(entities: Value) -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let output = dir.path().join("build");
        fs::create_dir_all(source.join("assets")).unwrap();
        fs::create_dir_all(source.join("entities")).unwrap();
        fs::write(
            source.join("entities/models.json"),
            serde_json::to_vec(&entities).unwrap(),
        )
        .unwrap();
        Self {
            _dir: dir,
            source,
            output,
        }
    }

    fn asset(&self, relative: &str, bytes: &[u8]) -> &Self {
        let path = self.source.join("assets").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
        self
    }

    fn options(&self) -> BuildOptions {
        BuildOptions::new(&self.source, &self.output)
    }

    fn baking(&self) -> BuildOptions {
        BuildOptions {
            bake: true,
            ..self.options()
        }
    }

    fn map(&self) -> serde_json::Map<String, Value> {
        let text = fs::read_to_string(self.output.join("assignment-client/assets/map.json")).unwrap();
        match serde_json::from_str(&text).unwrap() {
            Value::Object(map) => map,
            other => panic!("map.json is not an object: {other}"),
        }
    }

    fn entities(&self) -> Value {
        let gz = self.output.join("assignment-client/entities/models.json.gz");
        serde_json::from_slice(&read_gz(&gz).unwrap()).unwrap()
    }

    fn objects(&self) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(self.output.join("assignment-client/assets/files"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn zone_entities(url: &str) -> Value {
    json!({
        "Entities": [
            { "type": "Zone", "name": "zone1", "skybox": { "url": url } },
            { "type": "Model", "modelURL": "atp:/models/chair.fbx" }
        ],
        "Version": 93
    })
}

fn hex_of(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

#[test]
fn test_copy_only_build() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("zone1/skybox.png", b"png bytes")
        .asset("models/chair.fbx", b"fbx bytes");

    let baker = FakeBaker::default();
    let report = generate_build(&fixture.options(), &baker, &AssumeYes).unwrap();

    assert_eq!(baker.calls(), 0);
    assert_eq!(report.assets, 2);
    assert_eq!(report.copied, 2);
    assert_eq!(report.entities, EntityOutcome::Written { replaced: 0 });

    let map = fixture.map();
    assert_eq!(map["/zone1/skybox.png"], json!(hex_of(b"png bytes")));
    assert_eq!(map["/models/chair.fbx"], json!(hex_of(b"fbx bytes")));
    assert_eq!(fixture.entities(), zone_entities("atp:/zone1/skybox.png"));
}

#[test]
fn test_skybox_is_baked_and_url_rewritten() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("zone1/skybox.png", b"png bytes")
        .asset("zone1/unused.png", b"other png");

    let baker = FakeBaker::default();
    let report = generate_build(&fixture.baking(), &baker, &AssumeYes).unwrap();

    // Only the referenced texture goes through the tool.
    assert_eq!(baker.calls(), 1);
    assert_eq!(baker.calls.borrow()[0].1, BakeKind::Texture);
    assert_eq!(report.baked, 1);
    assert_eq!(report.copied, 1);
    assert_eq!(report.entities, EntityOutcome::Written { replaced: 1 });

    let map = fixture.map();
    assert_eq!(map["/zone1/skybox.ktx"], json!(hex_of(b"KTX baked")));
    assert!(!map.contains_key("/zone1/skybox.png"));
    assert!(map.contains_key("/zone1/unused.png"));

    let entities = fixture.entities();
    assert_eq!(
        entities["Entities"][0]["skybox"]["url"],
        json!("atp:/zone1/skybox.ktx")
    );
    assert_eq!(entities["Entities"][1], zone_entities("")["Entities"][1]);
}

#[test]
fn test_skip_baking_skyboxes_copies_texture() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture.asset("zone1/skybox.png", b"png bytes");

    let options = BuildOptions {
        skip_baking_skyboxes: true,
        ..fixture.baking()
    };
    let baker = FakeBaker::default();
    let report = generate_build(&options, &baker, &AssumeYes).unwrap();

    assert_eq!(baker.calls(), 0);
    assert_eq!(report.entities, EntityOutcome::Written { replaced: 0 });
    assert!(fixture.map().contains_key("/zone1/skybox.png"));
}

#[test]
fn test_model_outputs_land_next_to_source() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture.asset("models/chair.fbx", b"fbx bytes");

    let report = generate_build(&fixture.baking(), &FakeBaker::default(), &AssumeYes).unwrap();

    assert_eq!(report.baked, 1);
    let map = fixture.map();
    let keys: Vec<_> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["/models/chair.fbm/wood.ktx", "/models/chair.fst"]);
}

#[test]
fn test_identical_bytes_share_one_object() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("a/logo.png", b"same bytes")
        .asset("b/logo.png", b"same bytes");

    let report = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();

    assert_eq!(report.map_entries, 2);
    assert_eq!(report.objects, 1);
    assert_eq!(fixture.objects(), [hex_of(b"same bytes")]);

    let map = fixture.map();
    assert_eq!(map["/a/logo.png"], map["/b/logo.png"]);
}

#[test]
fn test_bake_failure_is_reported_and_skipped() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("models/broken.fbx", b"bad fbx")
        .asset("models/chair.fbx", b"fbx bytes");

    let report = generate_build(&fixture.baking(), &FakeBaker::default(), &AssumeYes).unwrap();

    assert_eq!(report.baked, 1);
    assert_eq!(report.bake_failures.len(), 1);
    let failure = &report.bake_failures[0];
    assert_eq!(failure.path.as_str(), "/models/broken.fbx");
    assert!(failure.reason.contains("unsupported FBX version"));

    let map = fixture.map();
    assert!(map.keys().all(|key| !key.contains("broken")));
    assert!(map.contains_key("/models/chair.fst"));
}

#[test]
fn test_rebuild_is_idempotent() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("zone1/skybox.png", b"png bytes")
        .asset("docs/readme.txt", b"hello");

    let first = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();
    let map_before = fixture.map();
    let objects_before = fixture.objects();

    let second = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();

    assert_eq!(first.written, 2);
    assert_eq!(second.written, 0);
    assert_eq!(fixture.map(), map_before);
    assert_eq!(fixture.objects(), objects_before);
}

#[test]
fn test_map_keys_are_canonical() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("deep/nested/dir/file.bin", b"1")
        .asset("top.bin", b"2");

    generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();

    for key in fixture.map().keys() {
        assert!(key.starts_with('/'), "{key}");
        assert!(!key.contains('\\'), "{key}");
        assert!(!key.contains("//"), "{key}");
    }
}

#[test]
fn test_ignored_files_are_skipped() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset(".DS_Store", b"finder")
        .asset("models/.DS_Store", b"finder")
        .asset("models/a.bin", b"a");

    let report = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();
    assert_eq!(report.assets, 1);
    assert_eq!(fixture.map().len(), 1);
}

#[test]
fn test_missing_entity_document_is_fatal() {
    let fixture = Fixture::new(json!({ "Entities": [] }));
    fs::remove_file(fixture.source.join("entities/models.json")).unwrap();
    fixture.asset("a.bin", b"a");

    let err = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap_err();
    assert!(err.to_string().contains("models.json"));
    assert!(!fixture.output.exists());
}

#[test]
fn test_missing_asset_dir_is_fatal() {
    let fixture = Fixture::new(json!({ "Entities": [] }));
    fs::remove_dir(fixture.source.join("assets")).unwrap();

    let err = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap_err();
    assert!(err.to_string().contains("asset directory"));
}

#[test]
fn test_declined_replace_keeps_existing_entities() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture.asset("zone1/skybox.png", b"png bytes");

    let gz = fixture.output.join("assignment-client/entities/models.json.gz");
    fs::create_dir_all(gz.parent().unwrap()).unwrap();
    fs::write(&gz, b"previous build").unwrap();

    let report = generate_build(&fixture.baking(), &FakeBaker::default(), &AssumeNo).unwrap();

    assert_eq!(report.entities, EntityOutcome::Kept);
    assert_eq!(fs::read(&gz).unwrap(), b"previous build");
    // Assets are still written.
    assert!(fixture.map().contains_key("/zone1/skybox.ktx"));
}

#[test]
fn test_overwrite_collision_last_wins() {
    // `models/chair.fst` collides with the baked output of `models/chair.fbx`.
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture
        .asset("models/chair.fbx", b"fbx bytes")
        .asset("models/chair.fst", b"hand written fst");

    let report = generate_build(&fixture.baking(), &FakeBaker::default(), &AssumeYes).unwrap();

    assert_eq!(report.collisions.overwrites.len(), 1);
    let overwrite = &report.collisions.overwrites[0];
    assert_eq!(overwrite.path.as_str(), "/models/chair.fst");
    assert_eq!(overwrite.previous.to_hex(), hex_of(b"fst"));
    assert_eq!(
        fixture.map()["/models/chair.fst"],
        json!(hex_of(b"hand written fst"))
    );
    // Both objects stay in the store.
    assert_eq!(report.objects, 3);
}

#[test]
fn test_extras_and_version() {
    let fixture = Fixture::new(json!({ "Entities": [] }));
    fs::create_dir_all(fixture.source.join("domain-server")).unwrap();
    fs::write(fixture.source.join("domain-server/config.json"), b"{\"a\":1}").unwrap();
    fs::write(fixture.source.join("content-version.txt"), b"7\n").unwrap();

    generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();
    assert_eq!(
        fs::read(fixture.output.join("domain-server/config.json")).unwrap(),
        b"{\"a\":1}"
    );
    assert_eq!(
        fs::read_to_string(fixture.output.join("content-version.txt")).unwrap(),
        "7\n"
    );

    let options = BuildOptions {
        version: Some("12".into()),
        ..fixture.options()
    };
    generate_build(&options, &FakeBaker::default(), &AssumeYes).unwrap();
    assert_eq!(
        fs::read_to_string(fixture.output.join("content-version.txt")).unwrap(),
        "12\n"
    );
}

#[test]
fn test_bake_dir_kept_on_request() {
    let fixture = Fixture::new(zone_entities("atp:/zone1/skybox.png"));
    fixture.asset("zone1/skybox.png", b"png bytes");

    let report = generate_build(&fixture.baking(), &FakeBaker::default(), &AssumeYes).unwrap();
    assert_eq!(report.kept_bake_dir, None);

    let options = BuildOptions {
        keep_bake_dir: true,
        ..fixture.baking()
    };
    let report = generate_build(&options, &FakeBaker::default(), &AssumeYes).unwrap();
    let kept = report.kept_bake_dir.unwrap();
    assert!(kept.join("0/skybox.ktx").is_file());
    fs::remove_dir_all(kept).unwrap();
}

#[test]
fn test_entity_floats_survive_build_and_pull() {
    let fixture = Fixture::new(json!({ "Entities": [] }));
    fs::write(
        fixture.source.join("entities/models.json"),
        br#"{"Entities":[{"type":"Box","position":{"x":0.19497932028647402,"y":0.9125469496135561}}]}"#,
    )
    .unwrap();

    generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();
    let position = &fixture.entities()["Entities"][0]["position"];
    assert_eq!(position["x"].as_f64().unwrap().to_bits(), 0.19497932028647402_f64.to_bits());
    assert_eq!(position["y"].as_f64().unwrap().to_bits(), 0.9125469496135561_f64.to_bits());

    let outcome = crate::pull::pull_build(&fixture.source, &fixture.output, &AssumeYes).unwrap();
    assert_eq!(outcome, crate::pull::PullOutcome::Pulled);
    let pulled: Value =
        serde_json::from_slice(&fs::read(fixture.source.join("entities/models.json")).unwrap())
            .unwrap();
    let position = &pulled["Entities"][0]["position"];
    assert_eq!(position["x"].as_f64().unwrap().to_bits(), 0.19497932028647402_f64.to_bits());
    assert_eq!(position["y"].as_f64().unwrap().to_bits(), 0.9125469496135561_f64.to_bits());
}

#[cfg(unix)]
#[test]
fn test_symlinked_assets_are_followed() {
    let fixture = Fixture::new(json!({ "Entities": [] }));
    fixture.asset("real/a.bin", b"linked bytes");
    let assets = fixture.source.join("assets");
    std::os::unix::fs::symlink(assets.join("real/a.bin"), assets.join("linked.bin")).unwrap();
    std::os::unix::fs::symlink(assets.join("missing.bin"), assets.join("dangling.bin")).unwrap();

    let report = generate_build(&fixture.options(), &FakeBaker::default(), &AssumeYes).unwrap();

    assert_eq!(report.assets, 2);
    let map = fixture.map();
    assert_eq!(map.len(), 2);
    assert_eq!(map["/real/a.bin"], json!(hex_of(b"linked bytes")));
    assert_eq!(map["/linked.bin"], map["/real/a.bin"]);
    assert_eq!(fixture.objects(), vec![hex_of(b"linked bytes")]);
}
