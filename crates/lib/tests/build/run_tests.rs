//! Tests for `Engine::run` and `Engine::clean`.

use assetgen_lib::{BuildError, GenerateError, RunSummary};

use super::common::{Project, mtime, sha256_hex};

const STYLE: &str = r#"
output.directory: static
output.hashed: true
output.manifest: assets.json
generate:
  - style.css:
      source:
        - css/reset.css
        - css/site.css
"#;

mod idempotence {
  use super::*;

  #[test]
  fn second_run_writes_nothing() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "*{margin:0}");
    project.source("css/site.css", "body{color:red}");
    let mut engine = project.open().unwrap();

    engine.run().unwrap();
    let manifest_before = project.read("assets.json");
    let state_before = std::fs::read(engine.state_path()).unwrap();
    let state_mtime = mtime(engine.state_path());
    let output_files = project.files_under("static");

    let summary = engine.run().unwrap();

    assert_eq!(summary, RunSummary::default());
    assert_eq!(project.read("assets.json"), manifest_before);
    assert_eq!(std::fs::read(engine.state_path()).unwrap(), state_before);
    assert_eq!(mtime(engine.state_path()), state_mtime);
    assert_eq!(project.files_under("static"), output_files);
  }

  #[test]
  fn fresh_engine_on_built_tree_writes_nothing() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "a");
    project.source("css/site.css", "b");
    project.open().unwrap().run().unwrap();

    let summary = project.open().unwrap().run().unwrap();
    assert_eq!(summary.generated(), 0);
    assert!(!summary.manifest_written);
    assert!(!summary.state_written);
  }
}

mod content_addressing {
  use super::*;

  #[test]
  fn end_to_end_edit_replaces_versioned_file() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "*{margin:0}");
    project.source("css/site.css", "body{color:red}");
    let mut engine = project.open().unwrap();

    engine.run().unwrap();
    let first = format!("{}-style.css", sha256_hex(b"*{margin:0}body{color:red}"));
    assert_eq!(project.manifest("assets.json")["style.css"], first);
    assert_eq!(project.files_under("static"), vec![first.clone()]);
    assert_eq!(project.read(&format!("static/{}", first)), "*{margin:0}body{color:red}");

    project.edit("css/site.css", "body{color:blue}");
    let summary = engine.run().unwrap();

    let second = format!("{}-style.css", sha256_hex(b"*{margin:0}body{color:blue}"));
    assert_eq!(summary.outputs_generated, 1);
    assert!(summary.manifest_written);
    assert_ne!(first, second);
    assert_eq!(project.manifest("assets.json")["style.css"], second);
    assert_eq!(project.files_under("static"), vec![second]);
  }

  #[test]
  fn identical_bytes_keep_the_same_name() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "a");
    project.source("css/site.css", "b");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();
    let before = project.manifest("assets.json");

    project.edit("css/site.css", "b");
    let summary = engine.run().unwrap();

    assert_eq!(summary.outputs_generated, 1);
    assert!(!summary.manifest_written);
    assert_eq!(project.manifest("assets.json"), before);
    assert_eq!(project.files_under("static").len(), 1);
  }

  #[test]
  fn unhashed_outputs_keep_logical_names() {
    let project = Project::new("output.directory: out\noutput.manifest: out/assets.json\ngenerate:\n  - js/app.js:\n      source: [{raw: 'var a;'}]\n      compressed: false\n");
    project.open().unwrap().run().unwrap();

    assert_eq!(project.read("out/js/app.js"), "var a;");
    assert_eq!(project.manifest("out/assets.json")["js/app.js"], "js/app.js");
  }
}

mod dependencies {
  use super::*;

  const TWO: &str = r#"
output.directory: out
generate:
  - a.txt:
      type: binary
      source: a.src
      depends: shared/a.dep
  - b.txt:
      type: binary
      source: b.src
"#;

  #[test]
  fn touching_a_dependency_rebuilds_only_its_asset() {
    let project = Project::new(TWO);
    project.source("a.src", "a");
    project.source("b.src", "b");
    project.source("shared/a.dep", "");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();
    let b_before = mtime(&project.path("out/b.txt"));

    project.touch("shared/a.dep", 60);
    let summary = engine.run().unwrap();

    assert_eq!(summary.outputs_generated, 1);
    assert_eq!(mtime(&project.path("out/b.txt")), b_before);
  }

  #[test]
  fn deleting_an_output_rebuilds_it() {
    let project = Project::new(TWO);
    project.source("a.src", "a");
    project.source("b.src", "b");
    project.source("shared/a.dep", "");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();

    std::fs::remove_file(project.path("out/b.txt")).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.outputs_generated, 1);
    assert_eq!(project.read("out/b.txt"), "b");
  }

  #[test]
  fn config_change_rebuilds_everything() {
    let project = Project::new(TWO);
    project.source("a.src", "a");
    project.source("b.src", "b");
    project.source("shared/a.dep", "");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();

    project.touch("assetgen.yaml", 60);
    assert_eq!(engine.run().unwrap().outputs_generated, 2);
  }

  #[test]
  fn missing_dependency_keeps_asset_stale() {
    let project = Project::new(TWO);
    project.source("a.src", "a");
    project.source("b.src", "b");
    let mut engine = project.open().unwrap();

    engine.run().unwrap();
    assert_eq!(engine.run().unwrap().outputs_generated, 1);
  }
}

mod prereqs {
  use super::*;

  const CONFIG: &str = r#"
output.directory: out
prereqs:
  - gen/banner.txt:
      type: binary
      source: banner.src
generate:
  - all.txt:
      type: binary
      source: [gen/banner.txt, body.src]
"#;

  #[test]
  fn prereqs_run_first_and_feed_outputs() {
    let project = Project::new(CONFIG);
    project.source("banner.src", "/* banner */");
    project.source("body.src", "body");
    let mut engine = project.open().unwrap();

    let summary = engine.run().unwrap();
    assert_eq!(summary.prereqs_generated, 1);
    assert_eq!(summary.outputs_generated, 1);
    assert_eq!(project.read("gen/banner.txt"), "/* banner */");
    assert_eq!(project.read("out/all.txt"), "/* banner */body");
    assert!(engine.state().manifest.contains_key("all.txt"));
    assert!(!engine.state().manifest.contains_key("gen/banner.txt"));
  }

  #[test]
  fn regenerated_prereq_rebuilds_dependent_output() {
    let project = Project::new(CONFIG);
    project.source("banner.src", "v1");
    project.source("body.src", "body");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();

    project.edit("banner.src", "v2");
    let summary = engine.run().unwrap();

    assert_eq!(summary.prereqs_generated, 1);
    assert_eq!(summary.outputs_generated, 1);
    assert_eq!(project.read("out/all.txt"), "v2body");
  }
}

mod manifest {
  use super::*;

  #[test]
  fn manifest_always_names_the_only_live_file() {
    let project = Project::new(
      r#"
output.directory: static
output.hashed: true
output.manifest: assets.json
generate:
  - a.css:
      source: a.src.css
  - img/*:
      source: images/*
      type: binary
"#,
    );
    project.source("a.src.css", "one");
    project.source("images/logo.png", "png");
    project.source("images/icons/x.gif", "gif");
    let mut engine = project.open().unwrap();

    for (round, content) in ["one", "two", "three", "two"].iter().enumerate() {
      if round > 0 {
        project.edit("a.src.css", content);
      }
      engine.run().unwrap();

      let manifest = project.manifest("assets.json");
      let mut live: Vec<String> = manifest.values().cloned().collect();
      live.sort();
      assert_eq!(project.files_under("static"), live);
      assert_eq!(manifest.len(), 3);
    }
  }

  #[test]
  fn manifest_force_rewrites_every_run() {
    let project = Project::new(
      "output.directory: out\noutput.manifest: assets.json\noutput.manifest_force: true\ngenerate:\n  - a.txt:\n      type: binary\n      source: [{raw: a}]\n",
    );
    let mut engine = project.open().unwrap();
    engine.run().unwrap();

    let summary = engine.run().unwrap();
    assert_eq!(summary.generated(), 0);
    assert!(summary.manifest_written);
  }

  #[test]
  fn wildcard_additions_need_a_reopen() {
    let project = Project::new("output.directory: out\ngenerate:\n  - img/*:\n      source: images/*\n      type: binary\n");
    project.source("images/a.png", "a");
    let mut engine = project.open().unwrap();
    assert_eq!(engine.assets().count(), 1);
    engine.run().unwrap();

    project.source("images/b.png", "b");
    engine.run().unwrap();
    assert!(!project.path("out/img/b.png").exists());

    drop(engine);
    let mut engine = project.open().unwrap();
    let outputs: Vec<&str> = engine.assets().map(|(_, asset)| asset.path.as_str()).collect();
    assert_eq!(outputs, vec!["img/a.png", "img/b.png"]);
    engine.run().unwrap();
    assert_eq!(project.read("out/img/b.png"), "b");
  }
}

mod embedding {
  use super::*;

  fn config(limit: u64) -> String {
    format!(
      r#"
output.directory: static
css.embed.path.root: images
css.embed.url.base: /static/
css.embed.data_limit: {limit}
css.embed.only: true
generate:
  - site.css:
      source: [{{raw: 'a{{b:embed("a.png")}}'}}]
"#
    )
  }

  #[test]
  fn payload_at_the_limit_is_inlined() {
    // 6 bytes are 8 base64 characters.
    let project = Project::new(&config(8));
    project.source("images/a.png", "abcdef");
    project.open().unwrap().run().unwrap();

    assert_eq!(
      project.read("static/site.css"),
      r#"a{b:url("data:image/png;base64,YWJjZGVm")}"#
    );
  }

  #[test]
  fn payload_over_the_limit_is_linked() {
    let project = Project::new(&config(7));
    project.source("images/a.png", "abcdef");
    project.open().unwrap().run().unwrap();

    assert_eq!(project.read("static/site.css"), r#"a{b:url("/static//a.png")}"#);
  }

  #[test]
  fn missing_embed_target_does_not_abort() {
    let project = Project::new(&config(0));
    let summary = project.open().unwrap().run().unwrap();

    assert_eq!(summary.outputs_generated, 1);
    assert_eq!(project.read("static/site.css"), r#"a{b:url("/static//a.png")}"#);
  }
}

mod failures {
  use super::*;

  #[test]
  fn abort_leaves_previous_record_and_manifest() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "a");
    project.source("css/site.css", "b");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();
    let manifest = project.read("assets.json");
    let state = std::fs::read(engine.state_path()).unwrap();

    std::fs::remove_file(project.path("css/site.css")).unwrap();
    project.touch("css/reset.css", 60);
    let err = engine.run().unwrap_err();

    assert!(matches!(
      err,
      BuildError::Generate {
        ref asset,
        source: GenerateError::Read { .. },
      } if asset == "style.css"
    ));
    assert_eq!(project.read("assets.json"), manifest);
    assert_eq!(std::fs::read(engine.state_path()).unwrap(), state);
  }

  #[test]
  fn corrupt_record_forces_full_rebuild() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "a");
    project.source("css/site.css", "b");
    let engine = project.open().unwrap();
    let state_path = engine.state_path().to_path_buf();
    drop(engine);
    std::fs::write(&state_path, "garbage").unwrap();

    let summary = project.open().unwrap().run().unwrap();
    assert_eq!(summary.outputs_generated, 1);
    assert!(summary.state_written);
  }

  #[test]
  fn missing_config_is_a_config_error() {
    let project = Project::new(STYLE);
    let err = project.open_at(&project.path("nope.yaml")).unwrap_err();
    assert!(matches!(err, BuildError::Config { .. }));
  }
}

mod clean {
  use super::*;

  #[test]
  fn clean_then_run_rebuilds_from_scratch() {
    let project = Project::new(STYLE);
    project.source("css/reset.css", "a");
    project.source("css/site.css", "b");
    let mut engine = project.open().unwrap();
    engine.run().unwrap();

    let cleaned = engine.clean().unwrap();
    assert!(cleaned.output_dir_removed);
    assert!(cleaned.state_removed);
    assert!(!project.path("static").exists());

    let summary = engine.run().unwrap();
    assert_eq!(summary.outputs_generated, 1);
    assert_eq!(project.files_under("static").len(), 1);
  }
}
