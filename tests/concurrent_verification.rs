//! Parallel verification produces the same per-package results as verifying
//! each package on its own.

use camino::Utf8PathBuf;
use hackcheck::config::AuditConfig;
use hackcheck::discovery::discover;
use hackcheck::fetch::extraction::ReleaseExtractor;
use hackcheck::package::{Package, Status};
use hackcheck::pipeline::Verifier;
use hackcheck::test_utils::{
    StubApplicator, StubReleaseSource, descriptor_text, tar_gz_archive, write_tree,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

const PACKAGES: usize = 12;

struct Site {
    root: TempDir,
    scratch: TempDir,
    source: StubReleaseSource,
}

impl Site {
    fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::try_from(self.root.path().to_path_buf()).expect("UTF-8 root")
    }

    fn config(&self) -> AuditConfig {
        AuditConfig {
            scratch_dir: Some(
                Utf8PathBuf::try_from(self.scratch.path().to_path_buf()).expect("UTF-8 scratch"),
            ),
            quality_check: None,
            ..AuditConfig::default()
        }
    }
}

fn module_name(index: usize) -> String {
    format!("mod{index:02}")
}

/// Lays out a site with a mix of clean, modified and unreleased packages.
#[fixture]
fn site() -> Site {
    let root = tempfile::tempdir().expect("temp dir");
    let scratch = tempfile::tempdir().expect("temp dir");
    let mut source = StubReleaseSource::new();

    for index in 0..PACKAGES {
        let name = module_name(index);
        let module = format!("<?php\n// {name}\n");
        let info = descriptor_text(&name, Some("7.x-2.3"));
        let info_path = format!("{name}/{name}.info");
        let module_path = format!("{name}/{name}.module");
        write_tree(
            root.path(),
            &[(info_path.as_str(), info.as_str()), (module_path.as_str(), module.as_str())],
        );
        if index % 4 != 3 {
            source = source.with_release(
                &name,
                "7.x-2.3",
                tar_gz_archive(&[
                    (info_path.as_str(), info.as_str()),
                    (module_path.as_str(), module.as_str()),
                ]),
            );
        }
        if index % 3 == 0 {
            write_tree(root.path(), &[(module_path.as_str(), "<?php\n// changed\n")]);
        }
    }

    Site {
        root,
        scratch,
        source,
    }
}

fn statuses(packages: &[Package]) -> Vec<(String, Status, Vec<String>)> {
    packages
        .iter()
        .map(|package| {
            (
                package.machine_name().to_string(),
                package.status(),
                package.differing_files().to_vec(),
            )
        })
        .collect()
}

#[rstest]
fn parallel_matches_sequential(site: Site) {
    let config = site.config();
    let applicator = StubApplicator::new();
    let verifier = Verifier::new(&config, &site.source, &ReleaseExtractor, &applicator);

    let mut sequential = discover(&site.root(), &config).expect("discover");
    for package in &mut sequential {
        verifier.verify(package);
    }

    let mut parallel = discover(&site.root(), &config).expect("discover");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("thread pool");
    pool.install(|| verifier.verify_all(&mut parallel, true));

    assert_eq!(parallel.len(), PACKAGES);
    assert_eq!(statuses(&parallel), statuses(&sequential));
    assert!(
        parallel.iter().any(|p| p.status() == Status::Hacked)
            && parallel.iter().any(|p| p.status() == Status::Ok)
            && parallel.iter().any(|p| matches!(p.status(), Status::Error(_)))
    );
    let leftovers = std::fs::read_dir(site.scratch.path())
        .expect("read scratch")
        .count();
    assert_eq!(leftovers, 0);
}
