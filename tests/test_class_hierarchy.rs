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
fn test_create_and_lookup() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    assert_eq!(person, 2);
    assert_eq!(graph.class_by_name("Person")?.id(), person);
    assert_eq!(graph.class_name(person)?, "Person");
    assert_eq!(graph.class_count(), 2);

    let record = graph.class(person)?;
    assert_eq!(record.parent_id(), ROOT_CLASS_ID);
    assert_eq!(record.count(), 0);
    assert!(!record.is_abstract());
    assert_ne!(record.first_index_id(), 0);

    // The new class is its parent's first child.
    assert_eq!(graph.class(ROOT_CLASS_ID)?.first_child_id(), person);

    assert!(matches!(
        graph.create_class(ROOT_CLASS_ID, "Person", false),
        Err(StoreError::DuplicateClassName(_))
    ));
    assert!(matches!(
        graph.class_by_name("Stranger"),
        Err(StoreError::DoesNotExist(StoreKind::Class, 0))
    ));
    Ok(())
}

#[test]
fn test_abstract_class_has_no_id_index() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let shape = graph.create_class(ROOT_CLASS_ID, "Shape", true)?;
    let record = graph.class(shape)?;
    assert!(record.is_abstract());
    assert_eq!(record.first_index_id(), 0);
    assert!(matches!(
        graph.create_vertex(shape),
        Err(StoreError::Store(StoreKind::Vertex))
    ));
    Ok(())
}

#[test]
fn test_delete_with_children_rejected() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let a = graph.create_class(ROOT_CLASS_ID, "A", false)?;
    let b = graph.create_class(a, "B", false)?;
    let c = graph.create_class(a, "C", false)?;

    assert!(matches!(
        graph.delete_class(a),
        Err(StoreError::HasChildren(id)) if id == a
    ));
    // The hierarchy is unchanged: C was wired in last, so it heads the child
    // list and B is its next sibling.
    assert_eq!(graph.class(a)?.first_child_id(), c);
    assert_eq!(graph.class(c)?.next_child_id(), b);
    assert_eq!(graph.class(b)?.next_child_id(), 0);
    assert_eq!(graph.class_count(), 4);
    Ok(())
}

#[test]
fn test_delete_with_members_rejected() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    let vertex = graph.create_vertex(person)?;
    assert!(matches!(
        graph.delete_class(person),
        Err(StoreError::HasMembers(id)) if id == person
    ));
    graph.delete_vertex(vertex)?;
    graph.delete_class(person)?;
    Ok(())
}

#[test]
fn test_delete_splices_sibling_chain() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let a = graph.create_class(ROOT_CLASS_ID, "A", false)?;
    let b = graph.create_class(a, "B", false)?;
    let c = graph.create_class(a, "C", false)?;
    let d = graph.create_class(a, "D", false)?;
    // Child list is D -> C -> B.
    assert_eq!(graph.class(a)?.first_child_id(), d);

    // Deleting a middle sibling rewrites its predecessor's link.
    graph.delete_class(c)?;
    assert_eq!(graph.class(a)?.first_child_id(), d);
    assert_eq!(graph.class(d)?.next_child_id(), b);
    assert_eq!(graph.class(b)?.next_child_id(), 0);

    // Deleting the first child rewrites the parent's first-child link.
    graph.delete_class(d)?;
    assert_eq!(graph.class(a)?.first_child_id(), b);

    // The deleted class is gone from the store and the name index.
    assert!(matches!(
        graph.class(c),
        Err(StoreError::DoesNotExist(StoreKind::Class, _))
    ));
    assert!(graph.class_by_name("C").is_err());

    // Freed ids are reused in LIFO order: D was freed last.
    let e = graph.create_class(a, "E", false)?;
    assert_eq!(e, d);
    Ok(())
}

#[test]
fn test_descendants_and_total_count() -> Result<()> {
    let (_dir, mut graph) = scratch_graph()?;
    let a = graph.create_class(ROOT_CLASS_ID, "A", false)?;
    let b = graph.create_class(a, "B", false)?;
    let c = graph.create_class(a, "C", false)?;
    let d = graph.create_class(b, "D", false)?;

    // Pre-order: C (head of the child list), then B with its subtree.
    let all: Vec<ClassId> = graph.descendant_classes(a)?.iter().copied().collect();
    assert_eq!(all, vec![c, b, d]);
    let direct: Vec<ClassId> = graph.child_classes(a)?.iter().copied().collect();
    assert_eq!(direct, vec![c, b]);

    for _ in 0..2 {
        graph.create_vertex(b)?;
    }
    for _ in 0..3 {
        graph.create_vertex(d)?;
    }
    graph.create_vertex(c)?;
    assert_eq!(graph.class(b)?.count(), 2);
    assert_eq!(graph.total_member_count(b)?, 5);
    assert_eq!(graph.total_member_count(a)?, 6);
    assert_eq!(graph.total_member_count(ROOT_CLASS_ID)?, 6);
    Ok(())
}

#[test]
fn test_autoincrement_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.fdb");
    let mut graph = Graph::create(&path)?;
    let person = graph.create_class(ROOT_CLASS_ID, "Person", false)?;
    assert_eq!(graph.increment_class(person)?, 1);
    assert_eq!(graph.increment_class(person)?, 2);
    graph.flush()?;
    drop(graph);

    let mut graph = Graph::open(&path)?;
    assert_eq!(graph.increment_class(person)?, 3);
    Ok(())
}

#[test]
fn test_hierarchy_survives_reload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.fdb");
    let mut graph = Graph::create(&path)?;
    let animal = graph.create_class(ROOT_CLASS_ID, "Animal", true)?;
    let dog = graph.create_class(animal, "Dog", false)?;
    let cat = graph.create_class(animal, "Cat", false)?;
    graph.flush()?;
    drop(graph);

    let mut graph = Graph::open(&path)?;
    assert_eq!(graph.class_count(), 4);
    assert_eq!(graph.class_by_name("Animal")?.id(), animal);
    assert_eq!(graph.class_by_name("Dog")?.id(), dog);
    assert_eq!(graph.class(animal)?.first_child_id(), cat);
    assert_eq!(graph.class(cat)?.next_child_id(), dog);
    assert!(graph.class(animal)?.is_abstract());

    // The class-name index was rebuilt, so creation still dedups.
    assert!(matches!(
        graph.create_class(ROOT_CLASS_ID, "Cat", false),
        Err(StoreError::DuplicateClassName(_))
    ));

    // Following parent links from any class reaches the root in at most
    // as many steps as there are live classes.
    for id in [dog, cat, animal] {
        let mut current = id;
        let mut steps = 0;
        while current != ROOT_CLASS_ID {
            current = graph.class(current)?.parent_id();
            steps += 1;
            assert!(steps <= graph.class_count());
        }
    }
    Ok(())
}
