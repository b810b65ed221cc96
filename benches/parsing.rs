use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use maildirshell::parser::tree::parse_mime_tree;
use maildirshell::parser::walker::{walk_parts, DEFAULT_MAX_DEPTH};
use maildirshell::render::html::PlainHtml;
use maildirshell::render::select::select_content;
use maildirshell::render::summary::render_structure;

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_walk_parts(c: &mut Criterion) {
    let raw = fixture("nested.eml");

    c.bench_function("walk_parts_nested", |b| {
        b.iter(|| {
            let mut count = 0u64;
            walk_parts(&raw, DEFAULT_MAX_DEPTH, &mut |_, _, _| {
                count += 1;
                Ok(())
            })
            .unwrap();
            count
        })
    });
}

fn bench_build_tree(c: &mut Criterion) {
    let raw = fixture("nested.eml");

    c.bench_function("build_tree_nested", |b| {
        b.iter(|| parse_mime_tree(&raw, DEFAULT_MAX_DEPTH).unwrap())
    });
}

fn bench_select_content(c: &mut Criterion) {
    let html = PlainHtml::default();
    for name in ["alternative.eml", "latin1_html.eml"] {
        let tree = parse_mime_tree(&fixture(name), DEFAULT_MAX_DEPTH).unwrap();
        c.bench_function(&format!("select_content_{name}"), |b| {
            b.iter(|| select_content(&tree, &html))
        });
    }
}

fn bench_structure(c: &mut Criterion) {
    let tree = parse_mime_tree(&fixture("nested.eml"), DEFAULT_MAX_DEPTH).unwrap();

    c.bench_function("render_structure_nested", |b| {
        b.iter(|| render_structure(&tree))
    });
}

criterion_group!(
    benches,
    bench_walk_parts,
    bench_build_tree,
    bench_select_content,
    bench_structure
);
criterion_main!(benches);
