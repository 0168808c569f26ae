mod common;

use common::{
    archive_entry, archive_names, archive_project_json, blank_project_json, png, wav, write_archive,
    Workspace, BACKDROP_MD5EXT, BREAD_SVG, COSTUME_MD5EXT,
};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use sb3doc_rs_core::asset::digest;
use sb3doc_rs_core::costume::Asset;
use sb3doc_rs_core::entity::Named;
use sb3doc_rs_core::ident::{ID_ALPHABET, ID_LENGTH};
use sb3doc_rs_core::media::DEFAULT_COSTUME_SVG;
use sb3doc_rs_core::variable::ScalarValue;
use sb3doc_rs_core::{Project, ProjectError};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;

#[fixture]
fn ws() -> Workspace {
    Workspace::new()
}

#[rstest]
fn resave_without_edits_keeps_document_and_assets(ws: Workspace) {
    let out = ws.path("out/resaved.sb3");
    Project::session(&ws.archive, |project| project.save(&out)).unwrap();

    assert_eq!(archive_project_json(&out), blank_project_json());
    assert_eq!(
        archive_names(&out),
        vec![BACKDROP_MD5EXT.to_string(), COSTUME_MD5EXT.to_string(), "project.json".to_string()]
    );
    assert_eq!(archive_entry(&out, BACKDROP_MD5EXT), b"<svg/>".to_vec());
}

#[rstest]
fn shared_payload_is_stored_once(ws: Workspace) {
    let bread = ws.file("art/Bread.svg", BREAD_SVG.as_bytes());
    let copy = ws.file("copies/Bread.svg", BREAD_SVG.as_bytes());
    let bass = ws.file("audio/Bass.wav", &wav(22050, 441));
    let out = ws.path("bread.sb3");

    Project::session(&ws.archive, |project| {
        project.add_costume("Sprite1", &bread, "Bread")?;
        project.add_costume("Stage", &copy, "Toast")?;
        project.add_sound("Sprite1", &bass, "Bass")?;
        project.save(&out)
    })
    .unwrap();

    let bread_md5ext = format!("{}.svg", digest(BREAD_SVG.as_bytes()));
    let wav_md5ext = format!("{}.wav", digest(&wav(22050, 441)));
    let names = archive_names(&out);
    assert_eq!(names.iter().filter(|n| **n == bread_md5ext).count(), 1);
    assert!(names.contains(&wav_md5ext));

    let doc = archive_project_json(&out);
    let sprite_costume = &doc["targets"][1]["costumes"][1];
    assert_eq!(sprite_costume["name"], json!("Bread"));
    assert_eq!(sprite_costume["md5ext"], json!(bread_md5ext));
    assert_eq!(sprite_costume["rotationCenterX"], json!(48));
    assert_eq!(sprite_costume["rotationCenterY"], json!(20));
    assert_eq!(doc["targets"][0]["costumes"][1]["md5ext"], json!(bread_md5ext));

    let sound = &doc["targets"][1]["sounds"][0];
    assert_eq!(sound["name"], json!("Bass"));
    assert_eq!(sound["rate"], json!(22050));
    assert_eq!(sound["sampleCount"], json!(441));
    assert_eq!(sound["dataFormat"], json!("wav"));
}

#[rstest]
fn same_file_under_two_names(ws: Workspace) {
    let bread = ws.file("Bread.svg", BREAD_SVG.as_bytes());
    let bass = ws.file("A Bass.wav", &wav(44100, 1000));
    let out = ws.path("out.sb3");

    Project::session(&ws.archive, |project| {
        project.get_sprite_by_name("Sprite1")?;
        project.add_costume("Sprite1", &bread, "Bread1")?;
        project.add_costume("Sprite1", &bread, "Bread2")?;
        project.add_sound("Sprite1", &bass, "Bass1")?;
        let sprite = project.get_sprite_by_name("Sprite1")?;
        assert_eq!(sprite.costumes().len(), 3);
        assert_eq!(sprite.sounds().len(), 1);
        project.save(&out)
    })
    .unwrap();

    let bread_md5ext = format!("{}.svg", digest(BREAD_SVG.as_bytes()));
    let names = archive_names(&out);
    assert_eq!(names.len(), 5);
    assert_eq!(archive_entry(&out, &bread_md5ext), BREAD_SVG.as_bytes().to_vec());

    let costumes = &archive_project_json(&out)["targets"][1]["costumes"];
    assert_eq!(costumes[1]["name"], json!("Bread1"));
    assert_eq!(costumes[2]["name"], json!("Bread2"));
    assert_eq!(costumes[1]["md5ext"], costumes[2]["md5ext"]);
}

#[rstest]
#[case("Bad.svg", br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 0 10"></svg>"#.to_vec())]
#[case("Broken.svg", b"<svg <<".to_vec())]
#[case("Fake.png", b"not a png at all, just text".to_vec())]
fn rejected_costume_leaves_no_payload(ws: Workspace, #[case] name: &str, #[case] data: Vec<u8>) {
    let file = ws.file(name, &data);
    let out = ws.path("rejected.sb3");
    let mut project = Project::open(&ws.archive).unwrap();
    let err = project.add_costume("Sprite1", &file, "Bad").unwrap_err();
    assert!(matches!(err, ProjectError::Validation { .. }), "{err}");
    project.save(&out).unwrap();

    let ext = name.rsplit('.').next().unwrap();
    assert!(!archive_names(&out).contains(&format!("{}.{}", digest(&data), ext)));
    assert_eq!(archive_project_json(&out), blank_project_json());
}

#[rstest]
fn failed_save_does_not_add_default_costumes(ws: Workspace) {
    let out = ws.path("invalid.sb3");
    let mut project = Project::open(&ws.archive).unwrap();
    project.create_sprite("Empty").unwrap();
    let say = project
        .get_sprite_by_name_mut("Sprite1")
        .unwrap()
        .blocks_mut()
        .get_mut("say")
        .unwrap();
    say.set_comment(Some("ghost".into()));

    let err = project.save(&out).unwrap_err();
    assert!(matches!(err, ProjectError::Validation { .. }), "{err}");
    assert!(!out.exists());
    assert_eq!(project.get_sprite_by_name("Empty").unwrap().costumes().len(), 0);

    let say = project
        .get_sprite_by_name_mut("Sprite1")
        .unwrap()
        .blocks_mut()
        .get_mut("say")
        .unwrap();
    say.set_comment(Some("c1".into()));
    project.save(&out).unwrap();
    assert_eq!(project.get_sprite_by_name("Empty").unwrap().costumes().len(), 1);
}

#[rstest]
fn re_adding_a_path_uses_the_first_read(ws: Workspace) {
    let bread = ws.file("Bread.svg", BREAD_SVG.as_bytes());
    let out = ws.path("reread.sb3");
    let mut project = Project::open(&ws.archive).unwrap();
    project.add_costume("Sprite1", &bread, "Bread1").unwrap();
    ws.file(
        "Bread.svg",
        br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"></svg>"#,
    );
    project.add_costume("Sprite1", &bread, "Bread2").unwrap();

    let sprite = project.get_sprite_by_name("Sprite1").unwrap();
    let first = sprite.costumes().by_name("Bread1").unwrap().output();
    let second = sprite.costumes().by_name("Bread2").unwrap().output();
    assert_eq!(first["md5ext"], second["md5ext"]);
    assert_eq!(second["rotationCenterX"], json!(48));
    assert_eq!(second["rotationCenterY"], json!(20));

    project.save(&out).unwrap();
    let bread_md5ext = format!("{}.svg", digest(BREAD_SVG.as_bytes()));
    assert_eq!(archive_entry(&out, &bread_md5ext), BREAD_SVG.as_bytes().to_vec());
}

#[rstest]
fn png_costume_is_bitmap_centred(ws: Workspace) {
    let logo = ws.file("Logo.PNG", &png(120, 80));
    let mut project = Project::open(&ws.archive).unwrap();
    project.add_costume("Sprite1", &logo, "Logo").unwrap();

    let sprite = project.get_sprite_by_name("Sprite1").unwrap();
    let costume = sprite.costumes().by_name("Logo").unwrap();
    assert!(costume.is_bitmap());
    assert_eq!(costume.meta().data_format, "png");
    let out = costume.output();
    assert_eq!(out["rotationCenterX"], json!(60));
    assert_eq!(out["rotationCenterY"], json!(40));
    assert_eq!(out["bitmapResolution"], json!(1));
}

#[rstest]
#[case("anim.gif")]
#[case("notes.txt")]
#[case("voice.mp3")]
fn unsupported_costume_formats_are_rejected(ws: Workspace, #[case] name: &str) {
    let file = ws.file(name, b"payload");
    let mut project = Project::open(&ws.archive).unwrap();
    let err = project.add_costume("Sprite1", &file, "Nope").unwrap_err();
    assert!(matches!(err, ProjectError::Validation { .. }), "{err}");
}

#[rstest]
fn generated_ids_are_unique_and_well_formed(ws: Workspace) {
    let mut project = Project::open(&ws.archive).unwrap();
    let before = project.document().ids_in_use();
    let mut seen = HashSet::new();
    for n in 0..50 {
        let id = project
            .create_variable("Sprite1", &format!("v{}", n), ScalarValue::from(n as i64))
            .unwrap();
        assert_eq!(id.chars().count(), ID_LENGTH);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert!(!before.contains(&id));
        assert!(seen.insert(id));
    }
    let list_id = project.create_list("Stage", "scores", vec![ScalarValue::from(3i64)]).unwrap();
    let broadcast_id = project.create_broadcast("start").unwrap();
    assert!(seen.insert(list_id));
    assert!(seen.insert(broadcast_id));
}

#[rstest]
fn duplicate_names_are_rejected_without_side_effects(ws: Workspace) {
    let other = ws.file("other.svg", BREAD_SVG.as_bytes());
    let out = ws.path("dup.sb3");

    let mut project = Project::open(&ws.archive).unwrap();
    let err = project.add_costume("Sprite1", &other, "costume1").unwrap_err();
    assert!(matches!(err, ProjectError::DuplicateName { .. }), "{err}");
    assert!(matches!(
        project.create_sprite("Sprite1"),
        Err(ProjectError::DuplicateName { .. })
    ));
    assert!(matches!(
        project.create_variable("Stage", "my variable", ScalarValue::from(1i64)),
        Err(ProjectError::DuplicateName { .. })
    ));
    project.save(&out).unwrap();

    let bread_md5ext = format!("{}.svg", digest(BREAD_SVG.as_bytes()));
    assert!(!archive_names(&out).contains(&bread_md5ext));
    assert_eq!(archive_project_json(&out), blank_project_json());
}

#[rstest]
fn missing_inputs_are_not_found(ws: Workspace) {
    let mut project = Project::open(&ws.archive).unwrap();
    let err = project
        .add_costume("Sprite1", &ws.path("nowhere.svg"), "Ghost")
        .unwrap_err();
    assert!(matches!(err, ProjectError::NotFound { .. }), "{err}");
    assert!(matches!(
        project.add_costume("Sprite9", &ws.path("nowhere.svg"), "Ghost"),
        Err(ProjectError::NotFound { .. })
    ));
    assert!(matches!(
        project.get_sprite_by_name("Sprite9"),
        Err(ProjectError::NotFound { .. })
    ));
}

#[rstest]
fn variables_are_found_across_targets(ws: Workspace) {
    let project = Project::open(&ws.archive).unwrap();
    let found = project.get_variables_by_name("my variable");
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|v| v.name() == "my variable"));
    assert!(project.get_variables_by_name("absent").is_empty());
}

#[rstest]
fn new_sprite_goes_on_top_and_gets_a_costume(ws: Workspace) {
    let out = ws.path("sprite.sb3");
    Project::session(&ws.archive, |project| {
        let sprite = project.create_sprite("Empty")?;
        assert_eq!(sprite.layer_order(), 2);
        project.save(&out)
    })
    .unwrap();

    let default_md5ext = format!("{}.svg", digest(DEFAULT_COSTUME_SVG.as_bytes()));
    let doc = archive_project_json(&out);
    let empty = &doc["targets"][2];
    assert_eq!(empty["name"], json!("Empty"));
    assert_eq!(empty["layerOrder"], json!(2));
    assert_eq!(empty["currentCostume"], json!(0));
    assert_eq!(empty["costumes"][0]["name"], json!("costume1"));
    assert_eq!(empty["costumes"][0]["md5ext"], json!(default_md5ext));
    assert!(archive_names(&out).contains(&default_md5ext));
}

#[rstest]
fn session_removes_scratch_on_success_and_failure(ws: Workspace) {
    let mut seen: Option<PathBuf> = None;
    Project::session(&ws.archive, |project| {
        seen = project.scratch_dir().map(PathBuf::from);
        Ok(())
    })
    .unwrap();
    let scratch = seen.take().unwrap();
    assert!(!scratch.exists());

    let err = Project::session(&ws.archive, |project| -> sb3doc_rs_core::ProjectResult<()> {
        seen = project.scratch_dir().map(PathBuf::from);
        Err(ProjectError::State("edit failed".into()))
    })
    .unwrap_err();
    assert!(matches!(err, ProjectError::State(ref m) if m == "edit failed"));
    assert!(!seen.unwrap().exists());
}

#[rstest]
fn each_open_gets_its_own_scratch(ws: Workspace) {
    let a = Project::open(&ws.archive).unwrap();
    let b = Project::open(&ws.archive).unwrap();
    assert_ne!(a.scratch_dir(), b.scratch_dir());
}

#[rstest]
fn save_after_close_is_a_state_error(ws: Workspace) {
    let mut project = Project::open(&ws.archive).unwrap();
    let scratch = project.scratch_dir().unwrap().to_path_buf();
    project.close().unwrap();
    assert!(!project.is_open());
    assert!(!scratch.exists());
    let err = project.save(&ws.path("late.sb3")).unwrap_err();
    assert!(matches!(err, ProjectError::State(_)), "{err}");
    project.close().unwrap();
}

#[rstest]
fn corrupt_archives_fail_to_open(ws: Workspace) {
    let junk = ws.file("junk.sb3", b"definitely not a zip");
    assert!(matches!(
        Project::open(&junk),
        Err(ProjectError::Archive { .. })
    ));

    let no_json = ws.path("nojson.sb3");
    let mut buffer = std::io::Cursor::new(Vec::<u8>::new());
    {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(&mut buffer);
        zip.start_file("a.svg", zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<svg/>").unwrap();
        zip.finish().unwrap();
    }
    std::fs::write(&no_json, buffer.into_inner()).unwrap();
    assert!(matches!(
        Project::open(&no_json),
        Err(ProjectError::Archive { .. })
    ));
}

#[rstest]
fn malformed_documents_fail_to_open(ws: Workspace) {
    let mut raw = blank_project_json();
    raw["targets"][0]["isStage"] = json!(false);
    raw["targets"][0]["visible"] = json!(true);
    let path = ws.path("nostage.sb3");
    write_archive(&path, &raw, &[]);
    assert!(Project::open(&path).is_err());
}

#[rstest]
fn edits_through_document_are_saved(ws: Workspace) {
    let out = ws.path("edited.sb3");
    Project::session(&ws.archive, |project| {
        let doc = project.document_mut();
        doc.extensions.add("music");
        let sprite = doc.targets.sprite_by_name_mut("Sprite1")?;
        let props = sprite.sprite_props_mut().unwrap();
        props.set_x(100.0)?;
        assert!(props.set_x(241.0).is_err());
        sprite.blocks_mut().detach_next("hat")?;
        let pruned = sprite.prune_orphans();
        assert_eq!(pruned, vec!["say".to_string()]);
        project.save(&out)
    })
    .unwrap();

    let doc = archive_project_json(&out);
    assert_eq!(doc["extensions"], json!(["pen", "music"]));
    let sprite = &doc["targets"][1];
    assert_eq!(sprite["x"], json!(100));
    assert_eq!(sprite["blocks"]["hat"]["next"], json!(null));
    assert!(sprite["blocks"].get("say").is_none());
    assert!(sprite["blocks"].get("loose").is_some());
    assert_eq!(sprite["comments"]["c1"]["blockId"], json!(null));
}
