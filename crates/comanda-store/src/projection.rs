use std::collections::{HashMap, HashSet};

use bson::{Bson, Document};

/// Inclusion projection over `columns`. `_id` is always kept at the top
/// level. Dotted columns trim sub-documents, including every document inside
/// an array.
pub fn apply_projection(doc: &mut Document, columns: &[String]) {
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    project(doc, &columns, true);
}

fn project(doc: &mut Document, columns: &[&str], keep_id: bool) {
    let mut flat_keys: HashSet<&str> = HashSet::new();
    // top key → remaining sub-paths
    let mut nested: HashMap<&str, Vec<&str>> = HashMap::new();

    for &col in columns {
        match col.split_once('.') {
            Some((top, rest)) => nested.entry(top).or_default().push(rest),
            None => {
                flat_keys.insert(col);
            }
        }
    }

    let keys_to_remove: Vec<String> = doc
        .keys()
        .filter(|k| {
            !(keep_id && *k == "_id")
                && !flat_keys.contains(k.as_str())
                && !nested.contains_key(k.as_str())
        })
        .cloned()
        .collect();
    for key in keys_to_remove {
        doc.remove(&key);
    }

    for (top, sub_paths) in &nested {
        // A whole-field column wins over narrower paths under it.
        if flat_keys.contains(top) {
            continue;
        }
        let keep = match doc.get_mut(*top) {
            Some(Bson::Document(sub)) => {
                project(sub, sub_paths, false);
                true
            }
            Some(Bson::Array(items)) => {
                items.retain_mut(|item| match item {
                    Bson::Document(sub) => {
                        project(sub, sub_paths, false);
                        true
                    }
                    _ => false,
                });
                true
            }
            _ => false,
        };
        if !keep {
            doc.remove(*top);
        }
    }
}
