use crate::asset::{extension_of, AssetStore};
use crate::costume::Costume;
use crate::error::{ProjectError, Result};
use crate::extensions::ExtensionSet;
use crate::fragment;
use crate::ident;
use crate::media::{self, DEFAULT_COSTUME_SVG};
use crate::metadata::Metadata;
use crate::monitor::MonitorManager;
use crate::sound::Sound;
use crate::target::{Target, TargetManager};
use crate::variable::{ScalarValue, Variable};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipArchive;

pub const PROJECT_JSON: &str = "project.json";

/// The parsed `project.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub targets: TargetManager,
    pub monitors: MonitorManager,
    pub extensions: ExtensionSet,
    pub meta: Metadata,
}

impl Document {
    pub fn parse(value: &Value) -> Result<Self> {
        let root = fragment::object(value, "project")?;
        let targets = root
            .get("targets")
            .ok_or_else(|| ProjectError::validation("project.targets", "required key is missing"))?;
        let meta = root
            .get("meta")
            .ok_or_else(|| ProjectError::validation("project.meta", "required key is missing"))?;
        Ok(Self {
            targets: TargetManager::load(targets)?,
            monitors: MonitorManager::load(root.get("monitors"))?,
            extensions: ExtensionSet::load(root.get("extensions"))?,
            meta: Metadata::load(meta)?,
        })
    }

    pub fn output(&self) -> Value {
        json!({
            "targets": self.targets.output(),
            "monitors": self.monitors.output(),
            "extensions": self.extensions.output(),
            "meta": self.meta.output(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.targets.validate()
    }

    /// Block, variable, list, broadcast and comment ids of every target.
    pub fn ids_in_use(&self) -> HashSet<String> {
        self.targets
            .iter()
            .flat_map(|t| t.ids().map(ToString::to_string))
            .collect()
    }
}

/// An `.sb3` archive opened for editing.
///
/// The archive is extracted into a fresh temporary directory that lives
/// exactly as long as the project is open; `close` or dropping the value
/// removes it.
#[derive(Debug)]
pub struct Project {
    source: PathBuf,
    scratch: Option<TempDir>,
    document: Document,
    assets: AssetStore,
}

impl Project {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ProjectError::not_found("Archive", path.display().to_string()));
        }
        let scratch = tempfile::Builder::new().prefix("sb3doc-").tempdir()?;
        debug!(archive = %path.display(), scratch = %scratch.path().display(), "extracting");

        let file = fs::File::open(path)?;
        let mut zip = ZipArchive::new(file).map_err(|e| ProjectError::Archive {
            path: path.to_path_buf(),
            message: format!("not a valid zip/.sb3 file ({})", e),
        })?;
        zip.extract(scratch.path())?;

        let json_path = scratch.path().join(PROJECT_JSON);
        if !json_path.is_file() {
            return Err(ProjectError::Archive {
                path: path.to_path_buf(),
                message: format!("{} not found", PROJECT_JSON),
            });
        }
        let raw: Value = serde_json::from_slice(&fs::read(&json_path)?)?;
        let document = Document::parse(&raw)?;
        debug!(targets = document.targets.len(), "parsed project document");

        Ok(Self {
            source: path.to_path_buf(),
            scratch: Some(scratch),
            document,
            assets: AssetStore::new(),
        })
    }

    /// Opens `path`, runs `edit`, and closes the project whatever happens.
    ///
    /// A failure inside `edit` is logged and returned after the scratch
    /// directory has been removed.
    pub fn session<T, F>(path: &Path, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Project) -> Result<T>,
    {
        let mut project = Self::open(path)?;
        let outcome = edit(&mut project);
        if let Err(err) = &outcome {
            error!(archive = %path.display(), error = %err, "project session failed");
        }
        let closed = project.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// Removes the scratch directory. Calling it twice is harmless.
    pub fn close(&mut self) -> Result<()> {
        if let Some(scratch) = self.scratch.take() {
            debug!(scratch = %scratch.path().display(), "removing scratch directory");
            scratch.close()?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.scratch.is_some()
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn generate_id(&self) -> String {
        ident::generate_id(&mut rand::rng(), &self.document.ids_in_use())
    }

    pub fn get_stage(&self) -> Result<&Target> {
        self.document.targets.stage()
    }

    pub fn get_sprite_by_name(&self, name: &str) -> Result<&Target> {
        self.document.targets.sprite_by_name(name)
    }

    pub fn get_sprite_by_name_mut(&mut self, name: &str) -> Result<&mut Target> {
        self.document.targets.sprite_by_name_mut(name)
    }

    /// Every variable called `name` in every target.
    pub fn get_variables_by_name(&self, name: &str) -> Vec<&Variable> {
        self.document
            .targets
            .iter()
            .flat_map(|t| t.variables().by_name(name))
            .collect()
    }

    /// Adds an empty sprite above every existing layer.
    pub fn create_sprite(&mut self, name: &str) -> Result<&mut Target> {
        if name.trim().is_empty() {
            return Err(ProjectError::validation("sprite name", "must not be empty"));
        }
        let layer = self.document.targets.next_layer_order();
        self.document.targets.push(Target::new_sprite(name, layer))
    }

    pub fn create_variable(&mut self, target: &str, name: &str, value: ScalarValue) -> Result<String> {
        let id = self.generate_id();
        self.document
            .targets
            .get_mut(target)?
            .create_variable(id.clone(), name, value)?;
        Ok(id)
    }

    pub fn create_list(&mut self, target: &str, name: &str, items: Vec<ScalarValue>) -> Result<String> {
        let id = self.generate_id();
        self.document
            .targets
            .get_mut(target)?
            .create_list(id.clone(), name, items)?;
        Ok(id)
    }

    /// Broadcasts are global, so they always live on the stage.
    pub fn create_broadcast(&mut self, name: &str) -> Result<String> {
        let id = self.generate_id();
        self.document.targets.stage_mut()?.create_broadcast(id.clone(), name)?;
        Ok(id)
    }

    /// Adds an `.svg` or `.png` file as a costume of `target` (stage or sprite).
    pub fn add_costume(&mut self, target: &str, file: &Path, name: &str) -> Result<()> {
        self.check_new_asset_name(target, name, |t| t.costumes().has_name(name), "Costume")?;
        let format = extension_of(file)?;
        if format != "svg" && format != "png" {
            return Err(ProjectError::validation(
                "costume format",
                format!("'.{}' is not supported, expected .svg or .png", format),
            ));
        }
        let sourced = self.assets.load(file)?;
        let source_name = file.display().to_string();
        let costume = if format == "svg" {
            let center = media::svg_rotation_center(&sourced.data, &source_name)?;
            Costume::vector(&sourced.asset, name, center)?
        } else {
            let (w, h) = media::png_size(&sourced.data, &source_name)?;
            Costume::bitmap(&sourced.asset, name, (f64::from(w) / 2.0, f64::from(h) / 2.0), 1)?
        };
        self.assets.stage(sourced);
        self.document.targets.get_mut(target)?.add_costume(costume)
    }

    /// Adds a `.wav` file as a sound of `target`.
    pub fn add_sound(&mut self, target: &str, file: &Path, name: &str) -> Result<()> {
        self.check_new_asset_name(target, name, |t| t.sounds().has_name(name), "Sound")?;
        let format = extension_of(file)?;
        if format != "wav" {
            return Err(ProjectError::validation(
                "sound format",
                format!("'.{}' is not supported, expected .wav", format),
            ));
        }
        let sourced = self.assets.load(file)?;
        let info = media::wav_info(&sourced.data, &file.display().to_string())?;
        let sound = Sound::new(&sourced.asset, name, info.rate, info.sample_count);
        self.assets.stage(sourced);
        self.document.targets.get_mut(target)?.add_sound(sound)
    }

    fn check_new_asset_name<F>(
        &mut self,
        target: &str,
        name: &str,
        taken: F,
        what: &'static str,
    ) -> Result<()>
    where
        F: FnOnce(&Target) -> bool,
    {
        if name.trim().is_empty() {
            return Err(ProjectError::validation(
                format!("{} name", what.to_lowercase()),
                "must not be empty",
            ));
        }
        let t = self.document.targets.get_mut(target)?;
        if taken(t) {
            return Err(ProjectError::duplicate(what, name, target));
        }
        Ok(())
    }

    /// Gives every costume-less target the editor's blank costume.
    fn ensure_costumes(&mut self) -> Result<()> {
        if self.document.targets.iter().all(|t| !t.costumes().is_empty()) {
            return Ok(());
        }
        let center = media::svg_rotation_center(DEFAULT_COSTUME_SVG.as_bytes(), "default costume")?;
        let asset = self.assets.add_bytes(DEFAULT_COSTUME_SVG.as_bytes(), "svg");
        for target in self.document.targets.iter_mut() {
            if !target.costumes().is_empty() {
                continue;
            }
            let name = if target.is_stage() { "backdrop1" } else { "costume1" };
            warn!(target = target.name(), costume = name, "target has no costumes; adding blank costume");
            target.add_costume(Costume::vector(&asset, name, center)?)?;
            target.set_current_costume(1)?;
        }
        Ok(())
    }

    /// Writes the edited project to `output` as a new `.sb3` archive.
    pub fn save(&mut self, output: &Path) -> Result<()> {
        let scratch = self
            .scratch
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or_else(|| ProjectError::State(format!("cannot save '{}' after close", self.source.display())))?;

        self.document.validate()?;
        self.ensure_costumes()?;

        let copied = self.assets.materialize(&scratch)?;
        debug!(copied, "staged assets written");
        fs::write(
            scratch.join(PROJECT_JSON),
            serde_json::to_vec(&self.document.output())?,
        )?;

        let bytes = package_dir(&scratch)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, bytes)?;
        info!(output = %output.display(), "saved project");
        Ok(())
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to remove scratch directory");
        }
    }
}

/// Zips every file under `dir`, `project.json` first, the rest by name.
fn package_dir(dir: &Path) -> Result<Vec<u8>> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort_by(|(a, _), (b, _)| (a != PROJECT_JSON, a).cmp(&(b != PROJECT_JSON, b)));

    let mut buffer = Cursor::new(Vec::<u8>::new());
    let mut zip = zip::ZipWriter::new(&mut buffer);
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, path) in files {
        zip.start_file(name, opts)?;
        zip.write_all(&fs::read(&path)?)?;
    }
    zip.finish()?;
    Ok(buffer.into_inner())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .map_err(|_| ProjectError::State(format!("'{}' escaped the scratch directory", path.display())))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        out.push((name, path));
    }
    Ok(())
}
