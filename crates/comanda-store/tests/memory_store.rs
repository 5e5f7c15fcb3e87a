use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use comanda_query::{Query, SortDirection};
use comanda_store::{
    ArrayOp, CollectionConfig, DocumentStore, MemoryStore, Stage, StoreError,
};

fn seed_orders(store: &MemoryStore, n: i32) -> Vec<Document> {
    let docs = (0..n)
        .map(|i| {
            let estado = if i % 3 == 0 { "pendiente" } else { "completada" };
            doc! { "estado": estado, "total": i }
        })
        .collect();
    store.insert_many("Orden", docs).unwrap()
}

fn totals(docs: &[Document]) -> Vec<i32> {
    docs.iter().map(|d| d.get_i32("total").unwrap()).collect()
}

// ── Reads ───────────────────────────────────────────────────────

#[test]
fn skip_and_limit_window_the_sorted_sequence() {
    let store = MemoryStore::new();
    seed_orders(&store, 10);

    let query = Query {
        skip: Some(2),
        take: Some(3),
        ..Query::default().sorted("total", SortDirection::Asc)
    };
    let docs = store.find("Orden", &query).unwrap();
    assert_eq!(totals(&docs), vec![2, 3, 4]);
}

#[test]
fn descending_sort_and_projection() {
    let store = MemoryStore::new();
    seed_orders(&store, 4);

    let query = Query {
        projection: Some(vec!["total".into()]),
        ..Query::default().sorted("total", SortDirection::Desc)
    };
    let docs = store.find("Orden", &query).unwrap();
    assert_eq!(totals(&docs), vec![3, 2, 1, 0]);
    for doc in &docs {
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, ["_id", "total"]);
    }
}

#[test]
fn unsorted_reads_keep_insertion_order() {
    let store = MemoryStore::new();
    seed_orders(&store, 5);
    let docs = store.find("Orden", &Query::default()).unwrap();
    assert_eq!(totals(&docs), vec![0, 1, 2, 3, 4]);
}

#[test]
fn missing_collection_reads_as_empty() {
    let store = MemoryStore::new();
    assert!(store.find("Resena", &Query::default()).unwrap().is_empty());
    assert_eq!(store.count_documents("Resena", &doc! {}).unwrap(), 0);
    assert!(store.find_by_id("Resena", &ObjectId::new()).unwrap().is_none());
}

#[test]
fn string_filter_does_not_match_numbers() {
    let store = MemoryStore::new();
    seed_orders(&store, 3);
    let docs = store
        .find("Orden", &Query::new(doc! { "total": "1" }))
        .unwrap();
    assert!(docs.is_empty());
}

// ── Writes ──────────────────────────────────────────────────────

#[test]
fn bulk_update_touches_only_matches() {
    let store = MemoryStore::new();
    seed_orders(&store, 9);

    let result = store
        .update_many(
            "Orden",
            &doc! { "estado": "pendiente" },
            &doc! { "estado": "en_progreso" },
        )
        .unwrap();
    assert_eq!(result.matched_count, 3);
    assert_eq!(result.modified_count, 3);

    let moved = store
        .find("Orden", &Query::new(doc! { "estado": "en_progreso" }))
        .unwrap();
    assert_eq!(totals(&moved), vec![0, 3, 6]);
    assert_eq!(
        store
            .count_documents("Orden", &doc! { "estado": "completada" })
            .unwrap(),
        6
    );
}

#[test]
fn delete_with_no_matches_is_not_an_error() {
    let store = MemoryStore::new();
    seed_orders(&store, 3);
    let result = store
        .delete_many("Orden", &doc! { "estado": "cancelada" })
        .unwrap();
    assert_eq!(result.deleted_count, 0);
    assert_eq!(store.count_documents("Orden", &doc! {}).unwrap(), 3);
}

#[test]
fn find_by_id_and_update_returns_new_document() {
    let store = MemoryStore::new();
    let stored = store
        .insert_one("Orden", doc! { "estado": "pendiente", "total": 10 })
        .unwrap();
    let id = stored.get_object_id("_id").unwrap();

    let updated = store
        .find_by_id_and_update("Orden", &id, &doc! { "estado": "completada" })
        .unwrap()
        .unwrap();
    assert_eq!(updated.get_str("estado").unwrap(), "completada");
    assert_eq!(updated.get_i32("total").unwrap(), 10);

    assert!(
        store
            .find_by_id_and_update("Orden", &ObjectId::new(), &doc! { "total": 1 })
            .unwrap()
            .is_none()
    );
}

#[test]
fn find_by_id_and_delete_removes_once() {
    let store = MemoryStore::new();
    let stored = store.insert_one("Orden", doc! { "total": 1 }).unwrap();
    let id = stored.get_object_id("_id").unwrap();

    assert_eq!(store.find_by_id_and_delete("Orden", &id).unwrap(), Some(stored));
    assert_eq!(store.find_by_id_and_delete("Orden", &id).unwrap(), None);
}

#[test]
fn unique_index_rejects_duplicates() {
    let store = MemoryStore::new();
    store
        .create_collection(&CollectionConfig::new("Usuario").unique("correo"))
        .unwrap();
    store
        .insert_one("Usuario", doc! { "correo": "ana@x.mx" })
        .unwrap();

    let err = store
        .insert_one("Usuario", doc! { "correo": "ana@x.mx" })
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::DuplicateKey {
            collection: "Usuario".into(),
            field: "correo".into(),
            value: "ana@x.mx".into(),
        }
    );
}

#[test]
fn unordered_bulk_insert_keeps_valid_documents() {
    let store = MemoryStore::new();
    store
        .create_collection(&CollectionConfig::new("Usuario").unique("correo"))
        .unwrap();

    let err = store
        .insert_many(
            "Usuario",
            vec![
                doc! { "correo": "a@x.mx" },
                doc! { "correo": "a@x.mx" },
                doc! { "correo": "b@x.mx" },
            ],
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::PartialInsert { inserted: 2, .. }));
    assert_eq!(store.count_documents("Usuario", &doc! {}).unwrap(), 2);
}

#[test]
fn failed_bulk_update_publishes_nothing() {
    let store = MemoryStore::new();
    store
        .create_collection(&CollectionConfig::new("Usuario").unique("correo"))
        .unwrap();
    store
        .insert_many(
            "Usuario",
            vec![
                doc! { "correo": "a@x.mx", "nombre": "A" },
                doc! { "correo": "b@x.mx", "nombre": "B" },
            ],
        )
        .unwrap();

    let err = store
        .update_many("Usuario", &doc! {}, &doc! { "correo": "c@x.mx" })
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));
    assert_eq!(
        store
            .count_documents("Usuario", &doc! { "correo": "a@x.mx" })
            .unwrap(),
        1
    );
}

#[test]
fn inc_overflow_is_rejected_and_store_stays_writable() {
    let store = MemoryStore::new();
    store
        .insert_one("Orden", doc! { "folio": "A", "n": i64::MAX })
        .unwrap();

    let err = store
        .update_many("Orden", &doc! {}, &doc! { "$inc": { "n": 1_i64 } })
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidUpdate(_)));

    let found = store
        .find("Orden", &Query::new(doc! { "folio": "A" }))
        .unwrap();
    assert_eq!(found[0].get_i64("n").unwrap(), i64::MAX);

    store.insert_one("Orden", doc! { "folio": "B" }).unwrap();
    assert_eq!(store.count_documents("Orden", &doc! {}).unwrap(), 2);
}

// ── Aggregation ─────────────────────────────────────────────────

#[test]
fn favorites_pipeline_merges_back() {
    let store = MemoryStore::new();
    let user = store
        .insert_one("Usuario", doc! { "nombre": "Ana", "favoritos": ["tacos"] })
        .unwrap();
    store.insert_one("Usuario", doc! { "nombre": "Luis" }).unwrap();
    let id = user.get_object_id("_id").unwrap();

    let pipeline = |op, item: &str| {
        vec![
            Stage::Match(doc! { "_id": id }),
            Stage::UpdateArray {
                field: "favoritos".into(),
                op,
                item: Bson::from(item),
            },
            Stage::Merge {
                into: "Usuario".into(),
            },
        ]
    };

    let out = store
        .aggregate("Usuario", &pipeline(ArrayOp::AddToSet, "sushi"))
        .unwrap();
    assert!(out.is_empty());
    store
        .aggregate("Usuario", &pipeline(ArrayOp::AddToSet, "sushi"))
        .unwrap();
    store
        .aggregate("Usuario", &pipeline(ArrayOp::Pull, "tacos"))
        .unwrap();

    let ana = store.find_by_id("Usuario", &id).unwrap().unwrap();
    assert_eq!(ana.get_array("favoritos").unwrap(), &vec![Bson::from("sushi")]);
    let luis = store
        .find("Usuario", &Query::new(doc! { "nombre": "Luis" }))
        .unwrap();
    assert!(!luis[0].contains_key("favoritos"));
}

#[test]
fn join_pipeline_attaches_restaurant() {
    let store = MemoryStore::new();
    let r = store
        .insert_one("Restaurante", doc! { "nombre": "La Esquina" })
        .unwrap();
    let rid = r.get_object_id("_id").unwrap();
    store
        .insert_many(
            "Orden",
            vec![
                doc! { "restaurante_id": rid.to_hex(), "total": 1 },
                doc! { "restaurante_id": "not-an-id", "total": 2 },
            ],
        )
        .unwrap();

    let out = store
        .aggregate(
            "Orden",
            &[
                Stage::ToObjectId {
                    field: "restaurante_id".into(),
                    as_field: "restaurante_oid".into(),
                },
                Stage::Lookup {
                    from: "Restaurante".into(),
                    local_field: "restaurante_oid".into(),
                    foreign_field: "_id".into(),
                    as_field: "restaurante".into(),
                },
                Stage::Unwind("restaurante".into()),
            ],
        )
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get_i32("total").unwrap(), 1);
    assert_eq!(
        out[0]
            .get_document("restaurante")
            .unwrap()
            .get_str("nombre")
            .unwrap(),
        "La Esquina"
    );
}

#[test]
fn merge_must_be_last() {
    let store = MemoryStore::new();
    let err = store
        .aggregate(
            "Usuario",
            &[
                Stage::Merge {
                    into: "Usuario".into(),
                },
                Stage::Match(doc! {}),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidPipeline(_)));
}

fn add_to_set(id: ObjectId, item: String) -> Vec<Stage> {
    vec![
        Stage::Match(doc! { "_id": id }),
        Stage::UpdateArray {
            field: "favoritos".into(),
            op: ArrayOp::AddToSet,
            item: Bson::String(item),
        },
        Stage::Merge {
            into: "Usuario".into(),
        },
    ]
}

#[test]
fn concurrent_merges_keep_every_item() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let store = MemoryStore::new();
    let user = store
        .insert_one("Usuario", doc! { "nombre": "Ana", "favoritos": [] })
        .unwrap();
    let id = user.get_object_id("_id").unwrap();

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    store
                        .aggregate("Usuario", &add_to_set(id, format!("{t}-{i}")))
                        .unwrap();
                }
            });
        }
    });

    let ana = store.find_by_id("Usuario", &id).unwrap().unwrap();
    assert_eq!(
        ana.get_array("favoritos").unwrap().len(),
        THREADS * PER_THREAD
    );
}

#[test]
fn merges_do_not_revert_concurrent_updates() {
    const ROUNDS: i32 = 200;

    let store = MemoryStore::new();
    let user = store
        .insert_one("Usuario", doc! { "nombre": "Ana", "visitas": 0 })
        .unwrap();
    let id = user.get_object_id("_id").unwrap();

    std::thread::scope(|scope| {
        let store = &store;
        scope.spawn(move || {
            for i in 0..ROUNDS {
                store
                    .find_by_id_and_update("Usuario", &id, &doc! { "visitas": i + 1 })
                    .unwrap();
            }
        });
        scope.spawn(move || {
            for i in 0..ROUNDS {
                store
                    .aggregate("Usuario", &add_to_set(id, i.to_string()))
                    .unwrap();
            }
        });
    });

    let ana = store.find_by_id("Usuario", &id).unwrap().unwrap();
    assert_eq!(ana.get_i32("visitas").unwrap(), ROUNDS);
    assert_eq!(ana.get_array("favoritos").unwrap().len(), ROUNDS as usize);
}
