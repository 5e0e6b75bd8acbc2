// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rig_core::MetadataSource;

#[test]
fn loads_nodes_from_the_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(METADATA_FILENAME),
        concat!(
            "/plans/smoke:\n",
            "  execute:\n",
            "    how: tmt\n",
            "/tests/one:\n",
            "  test: exit 0\n",
        ),
    )
    .unwrap();

    let source = load_source(dir.path()).unwrap();
    assert_eq!(source.nodes().len(), 2);
    let test = source.get(&rig_core::NodeId::new("/tests/one")).unwrap();
    assert_eq!(test.get_str("test"), Some("exit 0"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_source(dir.path()).is_err());
}

#[test]
fn scalar_node_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(METADATA_FILENAME), "/tests/bad: 42\n").unwrap();
    assert!(load_source(dir.path()).is_err());
}
