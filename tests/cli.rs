mod common;

use clap::Parser;
use common::{archive_project_json, png, Workspace};
use rstest::{fixture, rstest};
use sb3doc_rs_core::cli::Args;
use sb3doc_rs_core::{run_cli, summarize, Project};
use serde_json::json;

#[fixture]
fn ws() -> Workspace {
    Workspace::new()
}

fn run(argv: &[&str]) -> anyhow::Result<()> {
    let args = Args::try_parse_from(std::iter::once("sb3doc-rs").chain(argv.iter().copied()))?;
    run_cli(&args)
}

#[rstest]
fn create_sprite_subcommand_writes_output(ws: Workspace) {
    let out = ws.path("cli/new.sb3");
    run(&[
        "create-sprite",
        ws.archive.to_str().unwrap(),
        out.to_str().unwrap(),
        "--name",
        "Cat",
    ])
    .unwrap();
    let doc = archive_project_json(&out);
    assert_eq!(doc["targets"][2]["name"], json!("Cat"));
}

#[rstest]
fn add_costume_defaults_name_to_file_stem(ws: Workspace) {
    let tile = ws.file("Tile.png", &png(32, 32));
    let out = ws.path("tile.sb3");
    run(&[
        "add-costume",
        ws.archive.to_str().unwrap(),
        out.to_str().unwrap(),
        "--target",
        "Stage",
        "--file",
        tile.to_str().unwrap(),
    ])
    .unwrap();
    let doc = archive_project_json(&out);
    assert_eq!(doc["targets"][0]["costumes"][1]["name"], json!("Tile"));
}

#[rstest]
fn failures_carry_context(ws: Workspace) {
    let out = ws.path("never.sb3");
    let err = run(&[
        "create-sprite",
        ws.archive.to_str().unwrap(),
        out.to_str().unwrap(),
        "--name",
        "Sprite1",
    ])
    .unwrap_err();
    assert!(err.to_string().starts_with("Failed to update"));
    assert!(!out.exists());

    let missing = ws.path("missing.sb3");
    let err = run(&["inspect", missing.to_str().unwrap()]).unwrap_err();
    assert!(err.to_string().contains("Input file not found"));
}

#[rstest]
fn summary_lists_targets_and_assets(ws: Workspace) {
    let text = Project::session(&ws.archive, |project| Ok(summarize(project.document()))).unwrap();
    assert!(text.contains("stage 'Stage' (layer 0): 0 blocks, 1 costumes, 0 sounds"));
    assert!(text.contains("sprite 'Sprite1' (layer 1): 3 blocks"));
    assert!(text.contains("  list items (2 items)"));
    assert!(text.contains("extensions: pen"));
}
