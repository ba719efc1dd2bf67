/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use fabricdb::prelude::*;

fn scratch_graph() -> Result<(tempfile::TempDir, Graph)> {
    let dir = tempfile::tempdir()?;
    let graph = Graph::create(dir.path().join("graph.fdb"))?;
    Ok((dir, graph))
}

#[test]
fn test_refcount_lifecycle() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;

    // Adding the same name twice returns one label with two references.
    let id = graph.add_label("Person")?;
    assert_eq!(graph.add_label("Person")?, id);
    assert_eq!(graph.label(id)?.refs(), 2);
    let text_id = graph.label(id)?.text_id();

    // One reference left: the label and its text are still present.
    graph.remove_label(id)?;
    assert_eq!(graph.label(id)?.refs(), 1);
    assert_eq!(graph.text(text_id)?.value(), "Person");
    assert_eq!(graph.label_by_name("Person")?.id(), id);

    // Dropping the last reference frees the slot and deletes the text.
    graph.remove_label(id)?;
    assert!(matches!(
        graph.label(id),
        Err(StoreError::DoesNotExist(StoreKind::Label, _))
    ));
    assert!(matches!(
        graph.label_by_name("Person"),
        Err(StoreError::DoesNotExist(StoreKind::Label, 0))
    ));
    assert!(matches!(
        graph.text(text_id),
        Err(StoreError::DoesNotExist(StoreKind::Text, _))
    ));

    // The freed id is at the head of the free-list.
    assert_eq!(graph.add_label("Other")?, id);
    Ok(())
}

#[test]
fn test_labels_shared_across_entities() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    let v1 = graph.create_vertex(person)?;
    let v2 = graph.create_vertex(person)?;

    // A class name and an edge label sharing the same text share a label.
    let knows_edge = graph.create_edge("Person", v1, v2)?;
    let label_id = graph.class(person)?.label_id();
    assert_eq!(graph.edge(knows_edge)?.label_id(), label_id);
    assert_eq!(graph.label(label_id)?.refs(), 2);

    graph.delete_edge(knows_edge)?;
    assert_eq!(graph.label(label_id)?.refs(), 1);
    Ok(())
}

#[test]
fn test_refcounts_survive_reload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.fdb");
    let mut graph = Graph::create(&path)?;
    let id = graph.add_label("shared")?;
    graph.add_label("shared")?;
    graph.add_label("lonely")?;
    graph.flush()?;
    drop(graph);

    let mut graph = Graph::open(&path)?;
    assert_eq!(graph.label_count(), 3); // "Vertex" plus the two above
    assert_eq!(graph.label_by_name("shared")?.id(), id);
    assert_eq!(graph.label(id)?.refs(), 2);
    assert_eq!(graph.label_by_name("lonely")?.refs(), 1);
    Ok(())
}
