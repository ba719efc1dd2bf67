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
fn test_vertex_lifecycle() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    let v1 = graph.create_vertex(person)?;
    let v2 = graph.create_vertex(person)?;
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.class(person)?.count(), 2);
    assert_eq!(graph.vertex(v1)?.class_id(), person);

    // Both vertices are registered in the class's id index.
    let index_id = graph.class(person)?.first_index_id();
    let ids = graph.indexes().id_index(index_id).unwrap();
    assert!(ids.has(v1));
    assert!(ids.has(v2));

    graph.delete_vertex(v2)?;
    assert_eq!(graph.vertex_count(), 1);
    assert_eq!(graph.class(person)?.count(), 1);
    assert!(!graph.indexes().id_index(index_id).unwrap().has(v2));
    assert!(matches!(
        graph.vertex(v2),
        Err(StoreError::DoesNotExist(StoreKind::Vertex, _))
    ));
    Ok(())
}

#[test]
fn test_edge_threading() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    let ada = graph.create_vertex(person)?;
    let bob = graph.create_vertex(person)?;
    let eve = graph.create_vertex(person)?;

    let e1 = graph.create_edge("knows", ada, bob)?;
    let e2 = graph.create_edge("knows", ada, eve)?;
    let e3 = graph.create_edge("employs", eve, ada)?;

    // New edges go to the head of both endpoint lists.
    assert_eq!(graph.vertex(ada)?.first_out_edge_id(), e2);
    assert_eq!(graph.edge(e2)?.next_out_edge_id(), e1);
    assert_eq!(graph.edge(e1)?.next_out_edge_id(), 0);
    assert_eq!(graph.vertex(ada)?.first_in_edge_id(), e3);
    assert_eq!(graph.vertex(bob)?.first_in_edge_id(), e1);
    assert_eq!(graph.vertex(eve)?.first_in_edge_id(), e2);
    assert_eq!(graph.label_by_name("knows")?.refs(), 2);

    // A vertex with edges cannot be deleted.
    assert!(matches!(
        graph.delete_vertex(ada),
        Err(StoreError::Store(StoreKind::Vertex))
    ));

    // Deleting a non-head edge splices the out list.
    graph.delete_edge(e1)?;
    assert_eq!(graph.vertex(ada)?.first_out_edge_id(), e2);
    assert_eq!(graph.edge(e2)?.next_out_edge_id(), 0);
    assert_eq!(graph.vertex(bob)?.first_in_edge_id(), 0);
    assert_eq!(graph.label_by_name("knows")?.refs(), 1);

    graph.delete_edge(e2)?;
    graph.delete_edge(e3)?;
    assert!(graph.label_by_name("knows").is_err());
    assert_eq!(graph.edge_count(), 0);

    // With its edges gone the vertex can be deleted.
    graph.delete_vertex(ada)?;
    Ok(())
}

#[test]
fn test_property_values() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;

    let age = graph.create_property("age", &PropertyValue::Integer(41))?;
    assert_eq!(graph.property_value(age)?, PropertyValue::Integer(41));

    let rate = graph.create_property("rate", &PropertyValue::Real(0.25))?;
    assert_eq!(graph.property_value(rate)?, PropertyValue::Real(0.25));

    let flag = graph.create_property("flag", &PropertyValue::Boolean(true))?;
    assert_eq!(graph.property_value(flag)?, PropertyValue::Boolean(true));

    // Short text stays inline in the record payload.
    let nickname = graph.create_property("nickname", &PropertyValue::Text("ada".into()))?;
    assert_eq!(
        graph.property(nickname)?.value()?,
        PropertyValue::Text("ada".into())
    );

    // Longer text is spilled to the text store and resolved on read.
    let motto_text = "simplicity is prerequisite for reliability";
    let motto = graph.create_property("motto", &PropertyValue::Text(motto_text.into()))?;
    let spilled = match graph.property(motto)?.value()? {
        PropertyValue::LongText(text_id) => text_id,
        other => panic!("expected spilled text, got {other:?}"),
    };
    assert_eq!(graph.text(spilled)?.value(), motto_text);
    assert_eq!(
        graph.property_value(motto)?,
        PropertyValue::Text(motto_text.into())
    );

    // Deleting the property deletes the spilled text and its key's label.
    graph.delete_property(motto)?;
    assert!(graph.text(spilled).is_err());
    assert!(graph.label_by_name("motto").is_err());
    assert_eq!(graph.property_count(), 4);
    Ok(())
}

#[test]
fn test_entities_survive_reload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.fdb");
    let mut graph = Graph::create(&path)?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    let ada = graph.create_vertex(person)?;
    let bob = graph.create_vertex(person)?;
    let knows = graph.create_edge("knows", ada, bob)?;
    let age = graph.create_property("age", &PropertyValue::Integer(36))?;
    graph.flush()?;
    drop(graph);

    let mut graph = Graph::open(&path)?;
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.property_count(), 1);
    assert_eq!(graph.vertex(ada)?.first_out_edge_id(), knows);
    assert_eq!(graph.edge(knows)?.to_vertex_id(), bob);
    assert_eq!(graph.property_value(age)?, PropertyValue::Integer(36));
    assert_eq!(graph.label_by_name("knows")?.refs(), 1);

    // The rebuilt id index still tracks the class's vertices.
    let index_id = graph.class(person)?.first_index_id();
    let ids = graph.indexes().id_index(index_id).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.has(ada) && ids.has(bob));
    Ok(())
}
