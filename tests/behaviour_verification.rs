//! BDD tests for package verification against stubbed releases.

use camino::Utf8PathBuf;
use hackcheck::config::AuditConfig;
use hackcheck::fetch::extraction::ReleaseExtractor;
use hackcheck::package::{Package, Status};
use hackcheck::pipeline::Verifier;
use hackcheck::quality::QualityReport;
use hackcheck::test_utils::{
    StubApplicator, StubQualityCheck, StubReleaseSource, descriptor_text, tar_gz_archive,
    write_tree,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;
use tempfile::TempDir;

const EXTRA_LINE: &str = "$hacked = TRUE;\n";

#[derive(Default)]
struct VerificationWorld {
    local: Option<TempDir>,
    scratch: Option<TempDir>,
    releases: Vec<(String, String)>,
    unofficial: Vec<String>,
    patch_effects: Vec<(String, String, String)>,
    package: Option<Package>,
    package_dir: Option<PathBuf>,
    status: Option<Status>,
    requests: Vec<String>,
    replayed: Vec<PathBuf>,
}

impl VerificationWorld {
    fn package(&self) -> &Package {
        self.package.as_ref().expect("package verified")
    }

    fn package_dir(&self) -> PathBuf {
        self.package_dir.clone().expect("local copy created")
    }
}

#[fixture]
fn world() -> VerificationWorld {
    VerificationWorld {
        local: Some(tempfile::tempdir().expect("temp dir")),
        scratch: Some(tempfile::tempdir().expect("temp dir")),
        ..Default::default()
    }
}

fn module_source(name: &str) -> String {
    format!("<?php\n\n/**\n * @file\n * {name} module.\n */\n")
}

fn release_archive(name: &str, version: &str) -> Vec<u8> {
    let info = format!(
        "{}\n; Information added by packaging script\nproject = \"{name}\"\n",
        descriptor_text(name, Some(version))
    );
    let module = module_source(name);
    let info_path = format!("{name}/{name}.info");
    let module_path = format!("{name}/{name}.module");
    let license_path = format!("{name}/LICENSE.txt");
    tar_gz_archive(&[
        (info_path.as_str(), info.as_str()),
        (module_path.as_str(), module.as_str()),
        (license_path.as_str(), "GPL-2.0-or-later\n"),
    ])
}

fn create_local_copy(world: &mut VerificationWorld, name: &str, version: Option<&str>) {
    let root = world.local.as_ref().expect("local root").path();
    let dir = root.join(name);
    let info_name = format!("{name}.info");
    let module_name = format!("{name}.module");
    let info = descriptor_text(name, version);
    let module = module_source(name);
    write_tree(
        &dir,
        &[
            (info_name.as_str(), info.as_str()),
            (module_name.as_str(), module.as_str()),
        ],
    );
    let suffixes = AuditConfig::default().descriptor_suffixes;
    world.package = Package::from_descriptor(&dir.join(&info_name), &suffixes)
        .expect("read descriptor");
    world.package_dir = Some(dir);
}

fn append_line(path: &std::path::Path) -> String {
    let mut contents = std::fs::read_to_string(path).expect("read local file");
    contents.push_str(EXTRA_LINE);
    std::fs::write(path, &contents).expect("write local file");
    contents
}

#[given("a release of \"{name}\" at \"{version}\"")]
fn given_release(world: &mut VerificationWorld, name: String, version: String) {
    world.releases.push((name, version));
}

#[given("the project \"{name}\" is not officially distributed")]
fn given_unofficial(world: &mut VerificationWorld, name: String) {
    world.unofficial.push(name);
}

#[given("a local copy of \"{name}\" at \"{version}\"")]
fn given_local_copy(world: &mut VerificationWorld, name: String, version: String) {
    create_local_copy(world, &name, Some(&version));
}

#[given("a local copy of \"{name}\" without a version")]
fn given_unversioned_copy(world: &mut VerificationWorld, name: String) {
    create_local_copy(world, &name, None);
}

#[given("the local file \"{file}\" has an extra line")]
fn given_extra_line(world: &mut VerificationWorld, file: String) {
    append_line(&world.package_dir().join(file));
}

#[given("a vendored patch \"{patch}\" that appends a line to \"{file}\"")]
fn given_vendored_patch(world: &mut VerificationWorld, patch: String, file: String) {
    let dir = world.package_dir();
    let patched = append_line(&dir.join(&file));
    let diff = format!(
        "--- a/{file}\n+++ b/{file}\n@@ -6,1 +6,2 @@\n  */\n+{EXTRA_LINE}"
    );
    std::fs::write(dir.join(&patch), diff).expect("write patch");
    world.patch_effects.push((patch, file, patched));
}

#[when("the package is verified")]
fn when_verified(world: &mut VerificationWorld) {
    let scratch = world.scratch.as_ref().expect("scratch").path().to_path_buf();
    let config = AuditConfig {
        scratch_dir: Some(Utf8PathBuf::try_from(scratch).expect("UTF-8 scratch path")),
        ..AuditConfig::default()
    };

    let mut source = StubReleaseSource::new();
    for (name, version) in &world.releases {
        source = source.with_release(name, version, release_archive(name, version));
    }
    for name in &world.unofficial {
        source = source.with_unofficial(name);
    }
    let mut applicator = StubApplicator::new();
    for (patch, file, contents) in &world.patch_effects {
        applicator = applicator.with_effect(patch, file, contents);
    }
    let quality = StubQualityCheck::new(Some(QualityReport::from([
        ("phpcs errors".to_owned(), 2),
        ("phpcs warnings".to_owned(), 5),
    ])));

    let verifier = Verifier::new(&config, &source, &ReleaseExtractor, &applicator)
        .with_quality_check(&quality);
    let package = world.package.as_mut().expect("local copy created");
    world.status = Some(verifier.verify(package));
    world.requests = source.requests();
    world.replayed = applicator.applied();
}

#[then("the status is \"{keyword}\"")]
fn then_status(world: &mut VerificationWorld, keyword: String) {
    let status = world.status.expect("status recorded");
    assert_eq!(status.keyword(), keyword, "unexpected status {status}");
    assert_eq!(world.package().status(), status);
}

#[then("no files differ")]
fn then_no_differences(world: &mut VerificationWorld) {
    let files = world.package().differing_files();
    assert!(files.is_empty(), "unexpected differences: {files:?}");
}

#[then("the differing files are \"{file}\"")]
fn then_differing_files(world: &mut VerificationWorld, file: String) {
    assert_eq!(world.package().differing_files(), [file]);
}

#[then("no patches were replayed")]
fn then_no_patches(world: &mut VerificationWorld) {
    assert!(world.package().patches().is_empty());
    assert!(world.replayed.is_empty());
}

#[then("the patch \"{patch}\" was replayed by absolute path")]
fn then_patch_replayed(world: &mut VerificationWorld, patch: String) {
    let expected = world.package_dir().join(patch);
    let patches = world.package().patches();
    assert_eq!(patches.len(), 1);
    let applied = patches.first().expect("one patch");
    assert!(applied.patch.path.is_absolute());
    assert_eq!(applied.patch.path, expected);
    assert!(applied.outcome.is_applied());
    assert_eq!(world.replayed, vec![expected]);
}

#[then("the scratch area is empty")]
fn then_scratch_empty(world: &mut VerificationWorld) {
    let scratch = world.scratch.as_ref().expect("scratch").path();
    let leftovers: Vec<_> = std::fs::read_dir(scratch)
        .expect("read scratch")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .collect();
    assert!(leftovers.is_empty(), "scratch not cleaned: {leftovers:?}");
}

#[then("no requests were made")]
fn then_no_requests(world: &mut VerificationWorld) {
    assert!(world.requests.is_empty(), "unexpected requests: {:?}", world.requests);
}

#[then("no release was downloaded")]
fn then_no_release(world: &mut VerificationWorld) {
    assert!(
        world.requests.iter().all(|request| !request.contains("releases/")),
        "unexpected release download: {:?}",
        world.requests
    );
}

#[then("a quality report is attached")]
fn then_quality_report(world: &mut VerificationWorld) {
    let report = world.package().quality_report().expect("quality report");
    assert_eq!(report.get("phpcs errors"), Some(&2));
    assert_eq!(report.get("phpcs warnings"), Some(&5));
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Untouched release is OK"
)]
fn scenario_untouched(world: VerificationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Appended line marks the package as hacked"
)]
fn scenario_hacked(world: VerificationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Vendored patch reproduces the local tree"
)]
fn scenario_vendored_patch(world: VerificationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Missing release is an error and leaves no scratch behind"
)]
fn scenario_missing_release(world: VerificationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Undeclared version is unknown"
)]
fn scenario_unknown(world: VerificationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Development snapshot is not compared"
)]
fn scenario_dev(world: VerificationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/verification.feature",
    name = "Unofficial project gets a quality report"
)]
fn scenario_custom(world: VerificationWorld) {
    let _ = world;
}
