#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipArchive;

pub const BACKDROP_MD5EXT: &str = "cd21514d0531fdffb22204e0ec5ed84a.svg";
pub const COSTUME_MD5EXT: &str = "bcf454acf82e4504149f7ffe07081dbc.svg";

pub const BREAD_SVG: &str =
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 96 40"><rect width="96" height="40"/></svg>"#;

/// A scratch folder holding a freshly built fixture archive.
pub struct Workspace {
    pub tmp: tempfile::TempDir,
    pub archive: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("blank.sb3");
        write_archive(&archive, &blank_project_json(), &default_assets());
        Self { tmp, archive }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.tmp.path().join(name)
    }

    /// Writes `data` to `name` inside the workspace and returns the path.
    pub fn file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, data).unwrap();
        path
    }
}

pub fn default_assets() -> Vec<(String, Vec<u8>)> {
    vec![
        (BACKDROP_MD5EXT.to_string(), b"<svg/>".to_vec()),
        (COSTUME_MD5EXT.to_string(), b"<svg></svg>".to_vec()),
    ]
}

pub fn write_archive(path: &Path, project: &Value, assets: &[(String, Vec<u8>)]) {
    let mut buffer = Cursor::new(Vec::<u8>::new());
    let mut zip = zip::ZipWriter::new(&mut buffer);
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file("project.json", opts).unwrap();
    zip.write_all(&serde_json::to_vec(project).unwrap()).unwrap();
    for (name, data) in assets {
        zip.start_file(name.as_str(), opts).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
    fs::write(path, buffer.into_inner()).unwrap();
}

pub fn archive_names(path: &Path) -> Vec<String> {
    let zip = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names = zip.file_names().map(ToString::to_string).collect::<Vec<_>>();
    names.sort();
    names
}

pub fn archive_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

pub fn archive_project_json(path: &Path) -> Value {
    serde_json::from_slice(&archive_entry(path, "project.json")).unwrap()
}

/// 16-bit mono PCM.
pub fn wav(rate: u32, frames: u32) -> Vec<u8> {
    let data_len = frames * 2;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.extend_from_slice(&(rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0);
    out
}

/// Signature plus IHDR chunk; enough for dimension sniffing.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&[8, 6, 0, 0, 0]);
    out.extend_from_slice(&[0, 0, 0, 0]);
    out
}

pub fn blank_project_json() -> Value {
    json!({
        "targets": [
            {
                "isStage": true,
                "name": "Stage",
                "variables": {"`jEk@4|i[#Fk?(8x)AV.-my variable": ["my variable", 0]},
                "lists": {},
                "broadcasts": {"bc1": "go"},
                "blocks": {},
                "comments": {},
                "currentCostume": 0,
                "costumes": [{
                    "name": "backdrop1",
                    "dataFormat": "svg",
                    "assetId": "cd21514d0531fdffb22204e0ec5ed84a",
                    "md5ext": BACKDROP_MD5EXT,
                    "rotationCenterX": 240,
                    "rotationCenterY": 180
                }],
                "sounds": [],
                "volume": 100,
                "layerOrder": 0,
                "tempo": 60,
                "videoTransparency": 50,
                "videoState": "on",
                "textToSpeechLanguage": null
            },
            {
                "isStage": false,
                "name": "Sprite1",
                "variables": {"sv1": ["my variable", "local"]},
                "lists": {"l1": ["items", [1, "two"]]},
                "broadcasts": {},
                "blocks": {
                    "hat": {
                        "opcode": "event_whenflagclicked",
                        "next": "say",
                        "parent": null,
                        "inputs": {},
                        "fields": {},
                        "shadow": false,
                        "topLevel": true,
                        "x": 48,
                        "y": 64
                    },
                    "say": {
                        "opcode": "looks_say",
                        "next": null,
                        "parent": "hat",
                        "inputs": {"MESSAGE": [1, [10, "Hello!"]]},
                        "fields": {},
                        "shadow": false,
                        "topLevel": false,
                        "comment": "c1"
                    },
                    "loose": [12, "my variable", "sv1", 300, 20]
                },
                "comments": {
                    "c1": {
                        "blockId": "say",
                        "x": 200,
                        "y": 90,
                        "width": 200,
                        "height": 200,
                        "minimized": false,
                        "text": "greets"
                    }
                },
                "currentCostume": 0,
                "costumes": [{
                    "name": "costume1",
                    "bitmapResolution": 1,
                    "dataFormat": "svg",
                    "assetId": "bcf454acf82e4504149f7ffe07081dbc",
                    "md5ext": COSTUME_MD5EXT,
                    "rotationCenterX": 48,
                    "rotationCenterY": 50
                }],
                "sounds": [],
                "volume": 100,
                "layerOrder": 1,
                "visible": true,
                "x": 0,
                "y": 0,
                "size": 100,
                "direction": 90,
                "draggable": false,
                "rotationStyle": "all around"
            }
        ],
        "monitors": [{
            "id": "`jEk@4|i[#Fk?(8x)AV.-my variable",
            "mode": "default",
            "opcode": "data_variable",
            "params": {"VARIABLE": "my variable"},
            "spriteName": null,
            "value": 0,
            "width": 0,
            "height": 0,
            "x": 5,
            "y": 5,
            "visible": true,
            "sliderMin": 0,
            "sliderMax": 100,
            "isDiscrete": true
        }],
        "extensions": ["pen"],
        "meta": {"semver": "3.0.0", "vm": "0.2.0", "agent": "fixture", "origin": "test"}
    })
}
