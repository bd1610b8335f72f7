//! Unit tests for directory comparison.

use super::*;
use crate::test_utils::write_tree;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Trees {
    reference: TempDir,
    target: TempDir,
}

impl Trees {
    fn compare(&self, ignore: &IgnoreSet) -> Vec<String> {
        compare_trees(self.reference.path(), self.target.path(), ignore).expect("compare")
    }
}

#[fixture]
fn trees() -> Trees {
    let reference = tempfile::tempdir().expect("temp dir");
    let target = tempfile::tempdir().expect("temp dir");
    let files = [
        ("foo.module", "<?php\n// foo\n"),
        ("foo.info", "name = Foo\n"),
        ("inc/helper.inc", "<?php\n"),
        ("inc/deep/more.inc", "<?php\n// more\n"),
    ];
    write_tree(reference.path(), &files);
    write_tree(target.path(), &files);
    Trees { reference, target }
}

#[rstest]
fn identical_trees_have_no_differences(trees: Trees) {
    assert!(trees.compare(&IgnoreSet::default()).is_empty());
}

#[rstest]
fn changed_file_is_listed_relative_to_root(trees: Trees) {
    write_tree(trees.target.path(), &[("inc/deep/more.inc", "<?php\n// hacked\n")]);

    assert_eq!(trees.compare(&IgnoreSet::default()), vec!["inc/deep/more.inc"]);
}

#[rstest]
fn same_length_content_change_is_detected(trees: Trees) {
    write_tree(trees.target.path(), &[("foo.module", "<?php\n// bar\n")]);

    assert_eq!(trees.compare(&IgnoreSet::default()), vec!["foo.module"]);
}

#[rstest]
fn one_sided_files_are_listed_from_both_sides(trees: Trees) {
    write_tree(trees.target.path(), &[("extra.php", "<?php\n")]);
    std::fs::remove_file(trees.target.path().join("inc/helper.inc")).expect("remove");

    assert_eq!(
        trees.compare(&IgnoreSet::default()),
        vec!["extra.php", "inc/helper.inc"]
    );
}

#[rstest]
fn one_sided_directory_lists_its_files(trees: Trees) {
    write_tree(
        trees.target.path(),
        &[("vendor/a.php", "a"), ("vendor/lib/b.php", "b")],
    );

    assert_eq!(
        trees.compare(&IgnoreSet::default()),
        vec!["vendor/a.php", "vendor/lib/b.php"]
    );
}

#[rstest]
fn empty_one_sided_directory_is_listed(trees: Trees) {
    std::fs::create_dir(trees.reference.path().join("empty")).expect("mkdir");

    assert_eq!(trees.compare(&IgnoreSet::default()), vec!["empty"]);
}

#[rstest]
fn file_replaced_by_directory_is_listed(trees: Trees) {
    std::fs::remove_file(trees.target.path().join("foo.module")).expect("remove");
    write_tree(trees.target.path(), &[("foo.module/inner.php", "x")]);

    assert_eq!(
        trees.compare(&IgnoreSet::default()),
        vec!["foo.module", "foo.module/inner.php"]
    );
}

#[rstest]
fn ignored_names_are_skipped_at_every_depth(trees: Trees) {
    write_tree(
        trees.target.path(),
        &[
            ("foo.info", "name = Foo\nversion = 7.x-1.0\n"),
            ("inc/deep/foo.info", "local only"),
            ("translations/de.po", "msgid"),
            (".git/config", "[core]"),
        ],
    );
    write_tree(trees.reference.path(), &[("translations/fr.po", "msgid")]);
    let ignore = IgnoreSet::new(["foo.info", "translations", ".git"]);

    assert!(trees.compare(&ignore).is_empty());
}

#[rstest]
fn comparison_is_repeatable(trees: Trees) {
    write_tree(
        trees.target.path(),
        &[("foo.module", "changed"), ("z.php", "z"), ("a.php", "a")],
    );

    let first = trees.compare(&IgnoreSet::default());
    let second = trees.compare(&IgnoreSet::default());

    assert_eq!(first, vec!["a.php", "foo.module", "z.php"]);
    assert_eq!(first, second);
}

#[cfg(unix)]
#[rstest]
fn symlinks_are_compared_by_target(trees: Trees) {
    use std::os::unix::fs::symlink;

    symlink("foo.module", trees.reference.path().join("link")).expect("symlink");
    symlink("foo.module", trees.target.path().join("link")).expect("symlink");
    symlink("foo.info", trees.reference.path().join("moved")).expect("symlink");
    symlink("/etc/passwd", trees.target.path().join("moved")).expect("symlink");

    assert_eq!(trees.compare(&IgnoreSet::default()), vec!["moved"]);
}

#[rstest]
fn large_files_differing_late_are_detected(trees: Trees) {
    let mut contents = "x".repeat(CHUNK * 3);
    write_tree(trees.reference.path(), &[("big.js", contents.as_str())]);
    contents.push('y');
    contents.remove(0);
    write_tree(trees.target.path(), &[("big.js", contents.as_str())]);

    assert_eq!(trees.compare(&IgnoreSet::default()), vec!["big.js"]);
}

#[rstest]
fn one_sided_directory_skips_ignored_names(trees: Trees) {
    write_tree(
        trees.target.path(),
        &[
            ("contrib/a.php", "a"),
            ("contrib/.git/HEAD", "ref"),
            ("contrib/deep/lib/b.php", "b"),
            ("contrib/deep/translations/de.po", "msgid"),
        ],
    );
    let ignore = IgnoreSet::new([".git", "translations"]);

    assert_eq!(
        trees.compare(&ignore),
        vec!["contrib/a.php", "contrib/deep/lib/b.php"]
    );
}
