pub mod asset;
pub mod block;
pub mod broadcast;
pub mod cli;
pub mod comment;
pub mod costume;
pub mod entity;
pub mod error;
pub mod extensions;
pub mod fragment;
pub mod ident;
pub mod media;
pub mod metadata;
pub mod monitor;
pub mod project;
pub mod sound;
pub mod target;
pub mod variable;

pub use error::{ProjectError, Result as ProjectResult};
pub use project::{Document, Project};
pub use target::{Target, TargetManager};

use anyhow::{Context, Result};
use cli::Command;
use costume::Asset;
use entity::Named;
use std::path::{Path, PathBuf};

pub fn run_cli(args: &cli::Args) -> Result<()> {
    match &args.command {
        Command::Inspect { input } => {
            let input = canonicalize_file(input)?;
            let summary = Project::session(&input, |project| Ok(summarize(project.document())))
                .with_context(|| format!("Failed to inspect '{}'.", input.display()))?;
            print!("{}", summary);
            Ok(())
        }
        Command::Resave { input, output } => edit_archive("Resave", input, output, |_| Ok(())),
        Command::AddCostume {
            input,
            output,
            target,
            file,
            name,
        } => {
            let name = asset_name(file, name.as_deref())?;
            edit_archive("Add costume", input, output, |project| {
                project.add_costume(target, file, &name)
            })
        }
        Command::AddSound {
            input,
            output,
            target,
            file,
            name,
        } => {
            let name = asset_name(file, name.as_deref())?;
            edit_archive("Add sound", input, output, |project| {
                project.add_sound(target, file, &name)
            })
        }
        Command::CreateSprite { input, output, name } => {
            edit_archive("Create sprite", input, output, |project| {
                project.create_sprite(name).map(|_| ())
            })
        }
    }
}

/// Open `input`, apply `edit`, save to `output`.
fn edit_archive<F>(prefix: &'static str, input: &Path, output: &Path, edit: F) -> Result<()>
where
    F: FnOnce(&mut Project) -> ProjectResult<()>,
{
    let progress = CliProgress::new(prefix, 3);
    progress.emit(1, "Resolving input path");
    let input = canonicalize_file(input)?;

    progress.emit(2, "Opening archive and applying edit");
    Project::session(&input, |project| {
        edit(project)?;
        progress.emit(3, "Writing .sb3");
        project.save(output)
    })
    .with_context(|| format!("Failed to update '{}'.", input.display()))?;
    Ok(())
}

fn asset_name(file: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }
    file.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive an asset name from '{}'; pass --name.", file.display()))
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
}

/// Human-readable overview used by `inspect`.
pub fn summarize(document: &Document) -> String {
    let mut out = String::new();
    for target in document.targets.iter() {
        let kind = if target.is_stage() { "stage" } else { "sprite" };
        out.push_str(&format!(
            "{} '{}' (layer {}): {} blocks, {} costumes, {} sounds\n",
            kind,
            target.name(),
            target.layer_order(),
            target.blocks().len(),
            target.costumes().len(),
            target.sounds().len(),
        ));
        for costume in target.costumes().iter() {
            out.push_str(&format!("  costume {} -> {}\n", costume.name(), costume.meta().md5ext));
        }
        for sound in target.sounds().iter() {
            out.push_str(&format!("  sound {} -> {}\n", sound.name(), sound.meta().md5ext));
        }
        for variable in target.variables().iter() {
            out.push_str(&format!("  variable {} = {}\n", variable.name(), variable.value()));
        }
        for list in target.lists().iter() {
            out.push_str(&format!("  list {} ({} items)\n", list.name(), list.items().len()));
        }
    }
    let extensions = document.extensions.iter().collect::<Vec<_>>();
    if !extensions.is_empty() {
        out.push_str(&format!("extensions: {}\n", extensions.join(", ")));
    }
    out.push_str(&format!(
        "monitors: {}, semver {}\n",
        document.monitors.len(),
        document.meta.semver
    ));
    out
}

struct CliProgress {
    prefix: &'static str,
    total: usize,
}

impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            total: total.max(1),
        }
    }

    fn emit(&self, step: usize, label: &str) {
        let step = step.clamp(1, self.total);
        let bar = render_progress_bar(step, self.total, 14);
        eprintln!(
            "[{}] {}... ({}/{}) {}",
            self.prefix, label, step, self.total, bar
        );
    }
}

fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < filled { '=' } else { '-' });
    }
    s.push(']');
    s
}
